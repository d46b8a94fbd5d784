// Command frame:
// 0       1       2       3       4       5
// +-------+-------+-------+-------+-------+-------+
// | 01cmd | Argument (big endian)         | crc 1 |
// +-------+-------+-------+-------+-------+-------+

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// CMD0, switches the card from SD mode into SPI mode.
    GoIdleState = 0,
    /// CMD1, starts the card's initialization.
    SendOpCond = 1,
    /// CMD16, sets the block length used by the read and write commands.
    SetBlockLen = 16,
    /// CMD17
    ReadSingleBlock = 17,
    /// CMD24
    WriteBlock = 24,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CrcMode {
    /// Precomputed value for CMD0, don't-care for everything else. Only valid while the card
    /// runs in SPI mode with CRC checking off.
    #[default]
    Placeholder,
    /// Computes the real CRC7 of every frame.
    Crc7,
}

/// CRC7 of CMD0 with a zero argument, the only frame checked before SPI mode is entered.
const GO_IDLE_STATE_CRC: u8 = 0x95;
const DEFAULT_CRC: u8 = 0xff;

pub fn crc7(data: &[u8]) -> u8 {
    let mut crc = 0_u8;
    for &byte in data {
        let mut d = byte;
        for _ in 0..8 {
            crc <<= 1;
            if (d ^ crc) & 0x80 != 0 {
                crc ^= 0x09;
            }
            d <<= 1;
        }
    }
    crc & 0x7f
}

impl Command {
    pub fn frame(self, argument: u32, crc: CrcMode) -> [u8; 6] {
        let mut frame = [0; 6];
        frame[0] = (self as u8 & 0x3f) | 0x40;
        frame[1..5].copy_from_slice(&argument.to_be_bytes());
        frame[5] = match (crc, self) {
            (CrcMode::Crc7, _) => crc7(&frame[..5]) << 1,
            (CrcMode::Placeholder, Command::GoIdleState) => GO_IDLE_STATE_CRC,
            (CrcMode::Placeholder, _) => DEFAULT_CRC,
        } | 0x01;
        frame
    }
}

/// Byte address of a block, as the read/write commands expect it.
pub const fn block_address(index: u32) -> u32 {
    index << 9
}
