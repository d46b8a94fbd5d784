/// Synchronous serial link to a single peripheral.
///
/// Every multi-byte exchange is bracketed by [`Bus::select`] and [`Bus::deselect`]. The link
/// itself never retries; that is left to the protocol on top of it.
pub trait Bus {
    type Error;

    /// Asserts chip select.
    fn select(&mut self) -> Result<(), Self::Error>;

    /// Releases chip select.
    fn deselect(&mut self) -> Result<(), Self::Error>;

    /// Shifts `byte` out and returns the byte shifted in at the same time.
    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.transfer(byte).map(|_| ())
    }

    /// Clocks out a filler byte to receive one.
    fn read(&mut self) -> Result<u8, Self::Error> {
        self.transfer(0xff)
    }

    /// Switches to the operating clock rate once the card is initialized.
    fn set_high_speed(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
