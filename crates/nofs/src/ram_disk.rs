extern crate std;

use sdmmc::{BLOCK_SIZE, Block, BlockDevice};
use std::vec::Vec;

#[derive(Debug, PartialEq)]
pub struct Unavailable;

/// Block device kept in memory, with a log of the blocks written and knobs for failure
/// injection.
pub struct RamDisk {
    pub blocks: Vec<Block>,
    pub writes: Vec<u32>,
    pub reads: usize,
    /// Writes that fail once each before the device behaves again.
    pub flaky_writes: u8,
    /// Number of writes accepted before the device goes dark. Every write after that fails,
    /// as if power had been cut.
    pub fail_writes_after: Option<usize>,
}

impl RamDisk {
    pub fn new(blocks: usize) -> Self {
        Self {
            blocks: std::vec![[0; BLOCK_SIZE]; blocks],
            writes: Vec::new(),
            reads: 0,
            flaky_writes: 0,
            fail_writes_after: None,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.blocks.concat()
    }
}

impl BlockDevice for RamDisk {
    type Error = Unavailable;

    fn read_block(&mut self, index: u32, block: &mut Block) -> Result<(), Self::Error> {
        self.reads += 1;
        let src = self.blocks.get(index as usize).ok_or(Unavailable)?;
        block.copy_from_slice(src);
        Ok(())
    }

    fn write_block(&mut self, index: u32, block: &Block) -> Result<(), Self::Error> {
        if self.flaky_writes > 0 {
            self.flaky_writes -= 1;
            return Err(Unavailable);
        }
        match &mut self.fail_writes_after {
            Some(0) => return Err(Unavailable),
            Some(budget) => *budget -= 1,
            None => {}
        }
        let dst = self.blocks.get_mut(index as usize).ok_or(Unavailable)?;
        dst.copy_from_slice(block);
        self.writes.push(index);
        Ok(())
    }
}
