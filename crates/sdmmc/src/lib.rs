#![no_std]

pub mod bus;
pub mod card;
pub mod command;
pub mod error;

#[cfg(test)]
mod emulated;

pub use bus::Bus;
pub use card::{Config, RetryPolicy, SdMmc};
pub use command::{Command, CrcMode};
pub use error::Error;

/// Size of one addressable block on the card.
pub const BLOCK_SIZE: usize = 512;

pub type Block = [u8; BLOCK_SIZE];

/// Storage addressed as a linear array of [`BLOCK_SIZE`] byte blocks.
pub trait BlockDevice {
    type Error;

    fn read_block(&mut self, index: u32, block: &mut Block) -> Result<(), Self::Error>;

    fn write_block(&mut self, index: u32, block: &Block) -> Result<(), Self::Error>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    type Error = T::Error;

    fn read_block(&mut self, index: u32, block: &mut Block) -> Result<(), Self::Error> {
        T::read_block(self, index, block)
    }

    fn write_block(&mut self, index: u32, block: &Block) -> Result<(), Self::Error> {
        T::write_block(self, index, block)
    }
}
