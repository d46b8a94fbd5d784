//! Settings kept in the last erase sector of the on-board flash.

use embassy_rp::Peripheral;
use embassy_rp::flash::{self, Blocking, ERASE_SIZE, Flash, Instance};

const FLASH_SIZE: usize = 2 * 1024 * 1024; // W25Q16JV
const OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

/// Blocks the resume scan may visit before the card counts as not holding a log.
pub const SCAN_LIMIT: u32 = 65_536;

#[derive(Copy, Clone, PartialEq, serde::Serialize, serde::Deserialize, defmt::Format)]
pub struct Settings {
    pub baudrate: u32,
    /// Position fixes per second.
    pub update_rate: u8,
    pub flush_every: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            baudrate: 9600,
            update_rate: 1,
            flush_every: 10,
        }
    }
}

impl Settings {
    pub fn log_config(&self) -> nofs::Config {
        nofs::Config {
            flush_every: self.flush_every,
            scan_limit: Some(SCAN_LIMIT),
            ..nofs::Config::default()
        }
    }
}

#[derive(defmt::Format, Debug)]
pub enum Error {
    Flash(flash::Error),
    Postcard(postcard::Error),
}

pub struct SettingsStore<'d, T: Instance> {
    buf: [u8; 64],
    flash: Flash<'d, T, Blocking, FLASH_SIZE>,
}

impl<'d, T: Instance> SettingsStore<'d, T> {
    pub fn new(flash: impl Peripheral<P = T> + 'd) -> Self {
        Self {
            buf: [0; 64],
            flash: Flash::<_, Blocking, FLASH_SIZE>::new_blocking(flash),
        }
    }

    /// Reads the stored settings. Unreadable or missing settings are replaced with the
    /// defaults, which are written back.
    pub fn load(&mut self) -> Result<Settings, Error> {
        match self.read() {
            r @ Ok(..) | r @ Err(Error::Flash(..)) => r,
            Err(Error::Postcard(e)) => {
                defmt::info!("no stored settings ({}), using defaults", e);
                let default = Settings::default();
                self.save(&default)?;
                Ok(default)
            }
        }
    }

    fn read(&mut self) -> Result<Settings, Error> {
        self.flash.blocking_read(OFFSET, self.buf.as_mut_slice())?;
        Ok(postcard::from_bytes_cobs(self.buf.as_mut_slice())?)
    }

    pub fn save(&mut self, settings: &Settings) -> Result<(), Error> {
        let data = postcard::to_slice_cobs(settings, self.buf.as_mut_slice())?;
        self.flash.blocking_erase(OFFSET, OFFSET + ERASE_SIZE as u32)?;
        self.flash.blocking_write(OFFSET, data)?;
        Ok(())
    }
}

impl From<flash::Error> for Error {
    fn from(e: flash::Error) -> Self {
        Self::Flash(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Self::Postcard(e)
    }
}
