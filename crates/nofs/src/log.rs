use sdmmc::{BLOCK_SIZE, Block, BlockDevice};

use crate::{Error, HEADER_SIZE, MAGIC, SENTINEL};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The working block is written out on every n-th append. Rollovers always write.
    pub flush_every: u8,
    /// Extra attempts for a block read or write before giving up.
    pub io_retries: u8,
    /// Upper bound on the blocks visited by the resume scan.
    pub scan_limit: Option<u32>,
    /// The resume hint in the header moves up once the log is this many blocks past it.
    /// `0` leaves it alone.
    pub hint_stride: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flush_every: 10,
            io_retries: 3,
            scan_limit: None,
            hint_stride: 64,
        }
    }
}

/// Position of the end-of-log marker.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub block: u32,
    pub offset: usize,
}

impl Cursor {
    /// Where the data of an empty log starts, right after the header.
    pub const START: Cursor = Cursor {
        block: 0,
        offset: HEADER_SIZE,
    };

    /// Byte address on the medium.
    pub const fn position(&self) -> u64 {
        self.block as u64 * BLOCK_SIZE as u64 + self.offset as u64
    }
}

pub struct NoFs<D> {
    dev: D,
    config: Config,
    block: u32,
    offset: usize,
    hint: u32,
    durable: Cursor,
    appends: u8,
    faulted: bool,
    buf: Block,
}

impl<D: BlockDevice> NoFs<D> {
    /// Turns `dev` into an empty log. Whatever was logged before is no longer reachable.
    pub fn format(dev: &mut D) -> Result<(), Error<D::Error>> {
        let mut buf = [0; BLOCK_SIZE];

        dev.read_block(0, &mut buf).map_err(Error::Device)?;
        buf[..MAGIC.len()].copy_from_slice(&MAGIC);
        buf[MAGIC.len()..HEADER_SIZE].copy_from_slice(&0_u32.to_be_bytes());
        buf[HEADER_SIZE] = SENTINEL;
        dev.write_block(0, &buf).map_err(Error::Device)?;

        dev.read_block(1, &mut buf).map_err(Error::Device)?;
        buf[0] = SENTINEL;
        dev.write_block(1, &buf).map_err(Error::Device)?;
        Ok(())
    }

    /// Finds the end of the log, starting the scan at the hint kept in the header.
    pub fn mount(dev: D, config: Config) -> Result<Self, Error<D::Error>> {
        let mut log = Self {
            dev,
            config,
            block: 0,
            offset: 0,
            hint: 0,
            durable: Cursor::START,
            appends: 0,
            faulted: false,
            buf: [0; BLOCK_SIZE],
        };

        log.read(0)?;
        if log.buf[..MAGIC.len()] != MAGIC {
            return Err(Error::Unformatted);
        }
        log.hint = u32::from_be_bytes([log.buf[4], log.buf[5], log.buf[6], log.buf[7]]);
        log.block = log.hint;

        let mut scanned = 0;
        log.offset = loop {
            if config.scan_limit.is_some_and(|limit| scanned >= limit) {
                return Err(Error::NoSentinel { scanned });
            }
            match log.read(log.block) {
                Ok(()) => (),
                // ran off the end of the medium
                Err(Error::Device(_)) if scanned > 0 => {
                    return Err(Error::NoSentinel { scanned });
                }
                Err(e) => return Err(e),
            }
            scanned += 1;

            let start = if log.block == 0 { HEADER_SIZE } else { 0 };
            if let Some(offset) = log.buf[start..].iter().position(|&b| b == SENTINEL) {
                break start + offset;
            }
            log.block += 1;
        };

        // a previous run may have died between writing a full block and marking the next one
        let current = log.block;
        log.stamp(current + 1)?;
        log.read(current)?;

        log.durable = log.cursor();
        Ok(log)
    }

    pub fn cursor(&self) -> Cursor {
        Cursor {
            block: self.block,
            offset: self.offset,
        }
    }

    /// End of the data that would survive a power loss right now.
    pub fn durable_cursor(&self) -> Cursor {
        self.durable
    }

    /// Block the next mount starts scanning at.
    pub fn hint(&self) -> u32 {
        self.hint
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn release(self) -> D {
        self.dev
    }

    /// Appends `data`, which must not contain [`SENTINEL`].
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error<D::Error>> {
        if self.faulted {
            return Err(Error::Faulted);
        }
        debug_assert!(!data.contains(&SENTINEL), "payload contains the end-of-log marker");

        for &byte in data {
            self.buf[self.offset] = byte;
            self.offset += 1;
            if self.offset == BLOCK_SIZE {
                self.roll_over()?;
            }
        }
        self.buf[self.offset] = SENTINEL;

        self.appends = self.appends.saturating_add(1);
        if self.appends >= self.config.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes the working block out now.
    pub fn flush(&mut self) -> Result<(), Error<D::Error>> {
        if self.faulted {
            return Err(Error::Faulted);
        }
        self.write(self.block)?;
        self.appends = 0;
        self.durable = self.cursor();
        Ok(())
    }

    fn roll_over(&mut self) -> Result<(), Error<D::Error>> {
        self.write(self.block)?;
        self.block += 1;
        self.durable = Cursor {
            block: self.block,
            offset: 0,
        };

        // keep one marked block ahead of the one being filled
        self.stamp(self.block + 1)?;
        self.advance_hint()?;
        self.stamp(self.block)?;
        self.offset = 0;
        Ok(())
    }

    /// Rewrites the header once the durable end has moved `hint_stride` blocks past the hint.
    /// Clobbers the working buffer.
    fn advance_hint(&mut self) -> Result<(), Error<D::Error>> {
        let stride = self.config.hint_stride;
        let block = self.durable.block;
        if stride == 0 || block < self.hint.saturating_add(stride) {
            return Ok(());
        }

        self.read(0)?;
        self.buf[MAGIC.len()..HEADER_SIZE].copy_from_slice(&block.to_be_bytes());
        self.write(0)?;
        self.hint = block;
        Ok(())
    }

    /// Loads block `index` into the working buffer and makes sure its first byte is a
    /// sentinel on the medium.
    fn stamp(&mut self, index: u32) -> Result<(), Error<D::Error>> {
        self.read(index)?;
        if self.buf[0] != SENTINEL {
            self.buf[0] = SENTINEL;
            self.write(index)?;
        }
        Ok(())
    }

    fn read(&mut self, index: u32) -> Result<(), Error<D::Error>> {
        let mut retries = self.config.io_retries;
        loop {
            match self.dev.read_block(index, &mut self.buf) {
                Ok(()) => return Ok(()),
                Err(_) if retries > 0 => retries -= 1,
                Err(e) => {
                    self.faulted = true;
                    return Err(Error::Device(e));
                }
            }
        }
    }

    fn write(&mut self, index: u32) -> Result<(), Error<D::Error>> {
        let mut retries = self.config.io_retries;
        loop {
            match self.dev.write_block(index, &self.buf) {
                Ok(()) => return Ok(()),
                Err(_) if retries > 0 => retries -= 1,
                Err(e) => {
                    self.faulted = true;
                    return Err(Error::Device(e));
                }
            }
        }
    }
}
