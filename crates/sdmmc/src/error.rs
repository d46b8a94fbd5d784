use core::fmt;

use crate::command::Command;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The underlying bus failed.
    Bus(E),
    /// The card never reached the expected state during initialization.
    InitTimeout(Command),
    /// Only `0xff` was read back within the polling window.
    ResponseTimeout(Command),
    /// The card answered a command with a non-zero status.
    Response { command: Command, response: u8 },
    /// The start-of-data token never arrived.
    DataTokenTimeout,
    /// The data response token of a write was not "accepted".
    WriteRejected(u8),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "bus error: {e:?}"),
            Error::InitTimeout(command) => {
                write!(f, "card not ready after {command:?}, retries exhausted")
            }
            Error::ResponseTimeout(command) => write!(f, "no response to {command:?}"),
            Error::Response { command, response } => {
                write!(f, "{command:?} failed, response: {response:#04x}")
            }
            Error::DataTokenTimeout => write!(f, "no start-of-data token"),
            Error::WriteRejected(token) => write!(f, "write rejected, token: {token:#04x}"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
