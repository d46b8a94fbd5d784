//! NMEA 0183 sentences: framing off a byte stream, checksum and validity classification, and
//! field decoding of the fix sentences.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod framer;
pub mod parser;
pub mod sentence;

pub mod messages {
    mod gga;
    mod rmc;

    pub use gga::*;
    pub use rmc::*;
}

pub use error::Error;
pub use framer::{ByteSource, SentenceBuffer};
pub use sentence::{Classification, Kind, classify};
