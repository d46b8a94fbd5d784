use core::fmt;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// A block read or write kept failing after all retries.
    Device(E),
    /// Block 0 doesn't carry the header, the medium was never formatted.
    Unformatted,
    /// No sentinel within the scanned range or before the end of the medium.
    NoSentinel { scanned: u32 },
    /// An earlier device error left the working block in an unknown state. Mount again.
    Faulted,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Device(e) => write!(f, "block device error: {e:?}"),
            Error::Unformatted => write!(f, "no log header in block 0"),
            Error::NoSentinel { scanned } => {
                write!(f, "no end-of-log marker in {scanned} scanned blocks")
            }
            Error::Faulted => write!(f, "log faulted by an earlier device error"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
