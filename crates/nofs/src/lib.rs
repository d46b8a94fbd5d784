//! NoFS, an append-only byte stream written straight onto raw blocks.
//!
//! The end of the log is marked by the [`SENTINEL`] byte. The first sentinel on the medium is
//! where writing resumes after a restart, so the payload must never contain it. The first byte
//! of the block after the current one is kept as a sentinel too, so a full block can be
//! written out before its successor has been touched.
//!
//! Block 0 starts with a header: the magic `NoFS` followed by the resume hint, a big endian
//! block index at or before the end of the log. The log data follows the header.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod log;

#[cfg(test)]
mod ram_disk;

pub use error::Error;
pub use log::{Config, Cursor, NoFs};

/// ETX, marks the end of the committed data.
pub const SENTINEL: u8 = 0x03;

pub(crate) const MAGIC: [u8; 4] = *b"NoFS";

/// Bytes of block 0 taken by the header.
pub const HEADER_SIZE: usize = MAGIC.len() + 4;
