//! Memory card on SPI0.

use embassy_rp::{Peripheral, gpio, spi};

use sdmmc::Bus;

/// Cards must be brought up at 400 kHz or less.
pub const INIT_FREQUENCY: u32 = 400_000;
pub const WORK_FREQUENCY: u32 = 16_000_000;

pub struct CardBus<'d, T: spi::Instance> {
    spi: spi::Spi<'d, T, spi::Blocking>,
    cs: gpio::Output<'d>,
}

impl<'d, T: spi::Instance> CardBus<'d, T> {
    pub fn new(
        inner: impl Peripheral<P = T> + 'd,
        clk: impl Peripheral<P = impl spi::ClkPin<T>> + 'd,
        mosi: impl Peripheral<P = impl spi::MosiPin<T>> + 'd,
        miso: impl Peripheral<P = impl spi::MisoPin<T>> + 'd,
        cs: impl Peripheral<P = impl gpio::Pin> + 'd,
    ) -> Self {
        let config = {
            let mut c = spi::Config::default();
            c.frequency = INIT_FREQUENCY;
            c
        };
        Self {
            spi: spi::Spi::new_blocking(inner, clk, mosi, miso, config),
            cs: gpio::Output::new(cs, gpio::Level::High),
        }
    }
}

impl<T: spi::Instance> Bus for CardBus<'_, T> {
    type Error = spi::Error;

    fn select(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low();
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high();
        Ok(())
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut buf = [byte];
        self.spi.blocking_transfer_in_place(&mut buf)?;
        Ok(buf[0])
    }

    fn set_high_speed(&mut self) -> Result<(), Self::Error> {
        self.spi.set_frequency(WORK_FREQUENCY);
        defmt::info!("SPI switched to {} Hz", WORK_FREQUENCY);
        Ok(())
    }
}
