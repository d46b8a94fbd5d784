use crate::bus::Bus;
use crate::command::{Command, CrcMode, block_address};
use crate::error::Error;
use crate::{BLOCK_SIZE, Block, BlockDevice};

const START_BLOCK_TOKEN: u8 = 0xfe;
const DATA_ACCEPTED: u8 = 0x05;
const DATA_RESPONSE_MASK: u8 = 0x1f;
const R1_IDLE: u8 = 0x01;
const R1_READY: u8 = 0x00;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u16,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u16) -> Self {
        Self { max_attempts }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(255)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Filler bytes clocked out with the card deselected before the first command.
    pub idle_bytes: u8,
    /// Attempts of CMD0 and of CMD1 each.
    pub init: RetryPolicy,
    /// Reads allowed while waiting for a command response.
    pub response: RetryPolicy,
    /// Reads allowed while waiting for the start-of-data token.
    pub data_token: RetryPolicy,
    /// Filler bytes clocked between a write command and its data.
    pub write_gap: u8,
    pub crc: CrcMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_bytes: 20,
            init: RetryPolicy::default(),
            response: RetryPolicy::default(),
            data_token: RetryPolicy::default(),
            write_gap: 100,
            crc: CrcMode::default(),
        }
    }
}

/// An SD/MMC card driven in SPI mode.
pub struct SdMmc<B> {
    bus: B,
    config: Config,
}

impl<B: Bus> SdMmc<B> {
    /// Brings the card into SPI mode and waits until it is ready for block commands.
    pub fn init(bus: B, config: Config) -> Result<Self, Error<B::Error>> {
        let mut card = Self { bus, config };

        card.bus.deselect().map_err(Error::Bus)?;
        for _ in 0..card.config.idle_bytes {
            card.bus.write(0xff).map_err(Error::Bus)?;
        }

        card.transaction(|card| {
            card.repeat_until(Command::GoIdleState, R1_IDLE)?;
            card.repeat_until(Command::SendOpCond, R1_READY)?;
            card.expect_ready(Command::SetBlockLen, BLOCK_SIZE as u32)
        })?;

        card.bus.set_high_speed().map_err(Error::Bus)?;
        Ok(card)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn release(self) -> B {
        self.bus
    }

    pub fn read_block(&mut self, index: u32, block: &mut Block) -> Result<(), Error<B::Error>> {
        self.transaction(|card| {
            card.expect_ready(Command::ReadSingleBlock, block_address(index))?;

            let mut token = 0xff;
            for _ in 0..card.config.data_token.max_attempts {
                token = card.bus.read().map_err(Error::Bus)?;
                if token == START_BLOCK_TOKEN {
                    break;
                }
            }
            if token != START_BLOCK_TOKEN {
                return Err(Error::DataTokenTimeout);
            }

            for b in block.iter_mut() {
                *b = card.bus.read().map_err(Error::Bus)?;
            }

            // CRC16, not checked in SPI mode
            card.bus.read().map_err(Error::Bus)?;
            card.bus.read().map_err(Error::Bus)?;
            Ok(())
        })
    }

    pub fn write_block(&mut self, index: u32, block: &Block) -> Result<(), Error<B::Error>> {
        self.transaction(|card| {
            card.expect_ready(Command::WriteBlock, block_address(index))?;

            for _ in 0..card.config.write_gap {
                card.bus.read().map_err(Error::Bus)?;
            }

            card.bus.write(START_BLOCK_TOKEN).map_err(Error::Bus)?;
            for b in block.iter() {
                card.bus.write(*b).map_err(Error::Bus)?;
            }
            card.bus.write(0xff).map_err(Error::Bus)?;
            card.bus.write(0xff).map_err(Error::Bus)?;

            let token = card.bus.read().map_err(Error::Bus)?;
            if token & DATA_RESPONSE_MASK != DATA_ACCEPTED {
                return Err(Error::WriteRejected(token));
            }

            // the card holds the line low while programming
            while card.bus.read().map_err(Error::Bus)? != 0xff {}
            Ok(())
        })
    }

    /// Runs `f` and releases chip select afterwards, whatever the outcome.
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error<B::Error>>,
    ) -> Result<T, Error<B::Error>> {
        let result = f(self);
        let deselected = self.bus.deselect().map_err(Error::Bus);
        let value = result?;
        deselected?;
        Ok(value)
    }

    /// Sends one command frame and returns the first non-`0xff` byte read back.
    fn command(&mut self, command: Command, argument: u32) -> Result<u8, Error<B::Error>> {
        // a few clocks with the card released so it finishes whatever it was doing
        self.bus.deselect().map_err(Error::Bus)?;
        self.bus.write(0xff).map_err(Error::Bus)?;
        self.bus.select().map_err(Error::Bus)?;

        for b in command.frame(argument, self.config.crc) {
            self.bus.write(b).map_err(Error::Bus)?;
        }

        for _ in 0..self.config.response.max_attempts {
            let response = self.bus.read().map_err(Error::Bus)?;
            if response != 0xff {
                return Ok(response);
            }
        }
        Err(Error::ResponseTimeout(command))
    }

    fn expect_ready(&mut self, command: Command, argument: u32) -> Result<(), Error<B::Error>> {
        match self.command(command, argument)? {
            R1_READY => Ok(()),
            response => Err(Error::Response { command, response }),
        }
    }

    fn repeat_until(&mut self, command: Command, expected: u8) -> Result<(), Error<B::Error>> {
        for _ in 0..self.config.init.max_attempts {
            match self.command(command, 0) {
                Ok(response) if response == expected => return Ok(()),
                Ok(_) | Err(Error::ResponseTimeout(_)) => (),
                Err(e) => return Err(e),
            }
        }
        Err(Error::InitTimeout(command))
    }
}

impl<B: Bus> BlockDevice for SdMmc<B> {
    type Error = Error<B::Error>;

    fn read_block(&mut self, index: u32, block: &mut Block) -> Result<(), Self::Error> {
        SdMmc::read_block(self, index, block)
    }

    fn write_block(&mut self, index: u32, block: &Block) -> Result<(), Self::Error> {
        SdMmc::write_block(self, index, block)
    }
}

const _: () = assert!(BLOCK_SIZE == 1 << 9);

#[cfg(test)]
mod tests {
    extern crate std;
    use crate::card::*;
    use crate::emulated::EmulatedCard;

    #[test]
    fn test_init() {
        let card = SdMmc::init(EmulatedCard::new(), Config::default()).unwrap();
        let bus = card.release();
        assert!(bus.high_speed);
        assert!(!bus.selected);
        assert_eq!(bus.commands[0], [0x40, 0x00, 0x00, 0x00, 0x00, 0x95]);
        assert_eq!(bus.commands.last().unwrap(), &[0x50, 0x00, 0x00, 0x02, 0x00, 0xff]);
        // 20 idle bytes plus the lead-in clock of the first command
        assert_eq!(bus.clocks_before_first_select, 21);
    }

    #[test]
    fn test_init_block_length_rejected() {
        let mut emulated = EmulatedCard::new();
        emulated.address_error = true;
        assert_eq!(
            SdMmc::init(emulated, Config::default()).err(),
            Some(Error::Response {
                command: Command::SetBlockLen,
                response: 0x20,
            })
        );
    }

    #[test]
    fn test_init_waits_for_op_cond() {
        let mut emulated = EmulatedCard::new();
        emulated.op_cond_busy = 10;
        let card = SdMmc::init(emulated, Config::default()).unwrap();
        let bus = card.release();
        let op_conds = bus.commands.iter().filter(|c| c[0] == 0x41).count();
        assert_eq!(op_conds, 11);
    }

    #[test]
    fn test_init_silent_card() {
        let mut emulated = EmulatedCard::new();
        emulated.silent = true;
        let config = Config {
            response: RetryPolicy::new(8),
            ..Config::default()
        };
        assert_eq!(
            SdMmc::init(emulated, config).err(),
            Some(Error::InitTimeout(Command::GoIdleState))
        );
    }

    #[test]
    fn test_init_op_cond_never_ready() {
        let mut emulated = EmulatedCard::new();
        emulated.op_cond_busy = usize::MAX;
        let config = Config {
            init: RetryPolicy::new(5),
            ..Config::default()
        };
        assert_eq!(
            SdMmc::init(emulated, config).err(),
            Some(Error::InitTimeout(Command::SendOpCond))
        );
    }

    #[test]
    fn test_write_then_read() {
        let mut card = SdMmc::init(EmulatedCard::new(), Config::default()).unwrap();

        let mut written = [0_u8; BLOCK_SIZE];
        for (i, b) in written.iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        card.write_block(3, &written).unwrap();

        let mut read = [0_u8; BLOCK_SIZE];
        card.read_block(3, &mut read).unwrap();
        assert_eq!(read, written);

        let mut other = [0xaa_u8; BLOCK_SIZE];
        card.read_block(4, &mut other).unwrap();
        assert_eq!(other, [0_u8; BLOCK_SIZE]);

        let bus = card.release();
        assert!(!bus.selected);
        assert!(bus.commands.contains(&[0x58, 0x00, 0x00, 0x06, 0x00, 0xff]));
        assert!(bus.commands.contains(&[0x51, 0x00, 0x00, 0x06, 0x00, 0xff]));
    }

    #[test]
    fn test_write_rejected() {
        let mut card = SdMmc::init(EmulatedCard::new(), Config::default()).unwrap();
        card.bus.reject_writes = true;
        assert_eq!(
            card.write_block(0, &[0x11; BLOCK_SIZE]),
            Err(Error::WriteRejected(0xeb))
        );
        assert!(!card.bus.selected);
    }

    #[test]
    fn test_read_without_data_token() {
        let mut card = SdMmc::init(EmulatedCard::new(), Config::default()).unwrap();
        card.bus.withhold_data_token = true;
        let mut block = [0; BLOCK_SIZE];
        assert_eq!(card.read_block(0, &mut block), Err(Error::DataTokenTimeout));
        assert!(!card.bus.selected);
    }

    #[test]
    fn test_command_error_response() {
        let mut card = SdMmc::init(EmulatedCard::new(), Config::default()).unwrap();
        card.bus.address_error = true;
        let mut block = [0; BLOCK_SIZE];
        assert_eq!(
            card.read_block(0, &mut block),
            Err(Error::Response {
                command: Command::ReadSingleBlock,
                response: 0x20,
            })
        );
        assert!(!card.bus.selected);
    }

    #[test]
    fn test_crc7_mode() {
        let config = Config {
            crc: CrcMode::Crc7,
            ..Config::default()
        };
        let mut card = SdMmc::init(EmulatedCard::new(), config).unwrap();
        let mut block = [0; BLOCK_SIZE];
        card.read_block(0, &mut block).unwrap();
        let bus = card.release();
        assert!(bus.commands.contains(&[0x41, 0x00, 0x00, 0x00, 0x00, 0xf9]));
        assert!(bus.commands.contains(&[0x51, 0x00, 0x00, 0x00, 0x00, 0x55]));
    }
}
