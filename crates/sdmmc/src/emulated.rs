//! A card in SPI mode, emulated closely enough to exercise the command, read and write paths.

extern crate std;

use core::convert::Infallible;
use std::collections::{BTreeMap, VecDeque};
use std::vec::Vec;

use crate::{BLOCK_SIZE, Block, Bus};

const ACCEPTED: u8 = 0xe5;
const REJECTED: u8 = 0xeb;

enum Phase {
    Command,
    WriteToken { index: u32 },
    WriteData { index: u32, data: Vec<u8> },
}

pub struct EmulatedCard {
    pub selected: bool,
    pub high_speed: bool,
    /// Never answers any command.
    pub silent: bool,
    /// CMD1 reports "still initializing" this many times.
    pub op_cond_busy: usize,
    pub reject_writes: bool,
    pub withhold_data_token: bool,
    pub address_error: bool,
    pub commands: Vec<[u8; 6]>,
    pub clocks_before_first_select: usize,
    ever_selected: bool,
    frame: Vec<u8>,
    out: VecDeque<u8>,
    phase: Phase,
    blocks: BTreeMap<u32, Block>,
}

impl EmulatedCard {
    pub fn new() -> Self {
        Self {
            selected: false,
            high_speed: false,
            silent: false,
            op_cond_busy: 0,
            reject_writes: false,
            withhold_data_token: false,
            address_error: false,
            commands: Vec::new(),
            clocks_before_first_select: 0,
            ever_selected: false,
            frame: Vec::new(),
            out: VecDeque::new(),
            phase: Phase::Command,
            blocks: BTreeMap::new(),
        }
    }

    fn respond(&mut self, frame: [u8; 6]) {
        self.commands.push(frame);
        if self.silent {
            return;
        }

        let argument = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        self.out.push_back(0xff);
        match frame[0] & 0x3f {
            0 if frame[5] == 0x95 => self.out.push_back(0x01),
            0 => self.out.push_back(0x09),
            1 if self.op_cond_busy > 0 => {
                self.op_cond_busy -= 1;
                self.out.push_back(0x01);
            }
            1 => self.out.push_back(0x00),
            16 | 17 | 24 if self.address_error => self.out.push_back(0x20),
            16 if argument as usize == BLOCK_SIZE => self.out.push_back(0x00),
            16 => self.out.push_back(0x40),
            17 => {
                self.out.push_back(0x00);
                if !self.withhold_data_token {
                    let block = self.blocks.get(&(argument >> 9)).copied();
                    self.out.extend([0xff, 0xfe]);
                    self.out.extend(block.unwrap_or([0; BLOCK_SIZE]));
                    self.out.extend([0x12, 0x34]);
                }
            }
            24 => {
                self.out.push_back(0x00);
                self.phase = Phase::WriteToken {
                    index: argument >> 9,
                };
            }
            _ => self.out.push_back(0x04),
        }
    }
}

impl Bus for EmulatedCard {
    type Error = Infallible;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.selected = true;
        self.ever_selected = true;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.selected = false;
        self.frame.clear();
        self.out.clear();
        self.phase = Phase::Command;
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        if !self.ever_selected {
            self.clocks_before_first_select += 1;
        }
        if !self.selected {
            return Ok(0xff);
        }

        let out = self.out.pop_front().unwrap_or(0xff);
        match &mut self.phase {
            Phase::Command => {
                if self.frame.is_empty() && byte & 0xc0 != 0x40 {
                    return Ok(out);
                }
                self.frame.push(byte);
                if self.frame.len() == 6 {
                    let mut frame = [0; 6];
                    frame.copy_from_slice(&self.frame);
                    self.frame.clear();
                    self.respond(frame);
                }
            }
            Phase::WriteToken { index } => {
                if byte == 0xfe {
                    self.phase = Phase::WriteData {
                        index: *index,
                        data: Vec::new(),
                    };
                }
            }
            Phase::WriteData { index, data } => {
                data.push(byte);
                // data followed by two CRC bytes
                if data.len() == BLOCK_SIZE + 2 {
                    let index = *index;
                    let mut block = [0; BLOCK_SIZE];
                    block.copy_from_slice(&data[..BLOCK_SIZE]);
                    self.phase = Phase::Command;
                    if self.reject_writes {
                        self.out.push_back(REJECTED);
                    } else {
                        self.blocks.insert(index, block);
                        self.out.push_back(ACCEPTED);
                        self.out.extend([0x00, 0x00, 0x00]);
                    }
                }
            }
        }
        Ok(out)
    }

    fn set_high_speed(&mut self) -> Result<(), Self::Error> {
        self.high_speed = true;
        Ok(())
    }
}
