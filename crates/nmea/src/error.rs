use core::fmt;

type NomError<'a> = nom::Err<nom::error::Error<&'a str>>;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum Error<'a> {
    ChecksumMismatch { expected: u8, actual: u8 },
    /// Doesn't start with `$`.
    InvalidFrame,
    /// Starts like a sentence but the line feed never came, the framer ran out of room.
    Truncated,
    ParseError(#[cfg_attr(feature = "defmt", defmt(Debug2Format))] NomError<'a>),
    Utf8Error(#[cfg_attr(feature = "defmt", defmt(Debug2Format))] core::str::Utf8Error),
}

impl fmt::Display for Error<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChecksumMismatch { expected, actual } => write!(
                f,
                "checksum mismatch, expected: {expected:02X}, actual: {actual:02X}"
            ),
            Error::InvalidFrame => write!(f, "not an NMEA sentence"),
            Error::Truncated => write!(f, "sentence truncated before line feed"),
            Error::ParseError(e) => e.fmt(f),
            Error::Utf8Error(e) => e.fmt(f),
        }
    }
}

impl<'a> From<NomError<'a>> for Error<'a> {
    fn from(e: NomError<'a>) -> Self {
        Self::ParseError(e)
    }
}

impl From<core::str::Utf8Error> for Error<'_> {
    fn from(e: core::str::Utf8Error) -> Self {
        Self::Utf8Error(e)
    }
}

impl core::error::Error for Error<'_> {}
