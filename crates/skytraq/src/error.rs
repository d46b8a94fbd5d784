use core::fmt;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The output buffer can't hold the frame, which needs this many bytes.
    BufferTooSmall(usize),
    /// The payload length doesn't fit the 16-bit length field.
    PayloadTooLarge(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooSmall(n) => write!(f, "frame needs a {n} byte buffer"),
            Error::PayloadTooLarge(n) => write!(f, "payload of {n} bytes is too large"),
        }
    }
}

impl core::error::Error for Error {}
