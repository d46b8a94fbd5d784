use nom::{
    IResult, Parser,
    bytes::complete::{take, take_until},
    character::complete::{anychar, char, digit1},
    combinator::{map_res, opt},
    sequence::{preceded, terminated},
};

use chrono::{NaiveDate, NaiveTime};

use crate::error::*;
use crate::messages::*;
use crate::sentence::{checksum, hex_byte};

pub(crate) fn number<T: core::str::FromStr>(i: &str) -> IResult<&str, T> {
    map_res(digit1, str::parse::<T>).parse(i)
}

pub(crate) fn skip_field(i: &str) -> IResult<&str, &str> {
    terminated(take_until(","), char(',')).parse(i)
}

pub(crate) fn time_hms_nano(i: &str) -> IResult<&str, NaiveTime> {
    map_res(
        (
            map_res(take(2usize), str::parse::<u32>),
            map_res(take(2usize), str::parse::<u32>),
            map_res(take(2usize), str::parse::<u32>),
            opt(preceded(char('.'), digit1)),
        ),
        |(h, m, s, nanos)| {
            let nanos = if let Some(nanos) = nanos {
                let num = nanos.parse::<u32>().map_err(|_| "invalid time")?;
                let len = nanos.len() as u32;
                if len > 9 {
                    num / 10_u32.pow(len - 9)
                } else {
                    num * 10_u32.pow(9 - len)
                }
            } else {
                0
            };
            NaiveTime::from_hms_nano_opt(h, m, s, nanos).ok_or("invalid time")
        },
    )
    .parse(i)
}

pub(crate) fn date_dmy(i: &str) -> IResult<&str, NaiveDate> {
    map_res(
        (
            map_res(take(2usize), str::parse::<u32>),
            map_res(take(2usize), str::parse::<u32>),
            map_res(take(2usize), str::parse::<u32>),
        ),
        |(d, m, y)| {
            NaiveDate::from_ymd_opt(
                y as i32 + 2000, // assume 2000's
                m,
                d,
            )
            .ok_or("invalid date")
        },
    )
    .parse(i)
}

/// Decoded fields of a sentence. Only the fix sentences are taken apart.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub enum MessageType {
    Gga(GgaData),
    Rmc(RmcData),
    Unsupported((char, char, char)),
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub struct Message {
    pub talker: (char, char),
    pub data: MessageType,
}

fn message(i: &str) -> IResult<&str, Message> {
    let (i, talker) = (anychar, anychar).parse(i)?;
    let (i, mt) = terminated((anychar, anychar, anychar), char(',')).parse(i)?;
    let (i, data) = match mt {
        ('G', 'G', 'A') => {
            let (i, data) = gga(i)?;
            (i, MessageType::Gga(data))
        }
        ('R', 'M', 'C') => {
            let (i, data) = rmc(i)?;
            (i, MessageType::Rmc(data))
        }
        _ => (i, MessageType::Unsupported(mt)),
    };
    Ok((i, Message { talker, data }))
}

fn split_checksum(line: &[u8]) -> (&[u8], Option<u8>) {
    match line {
        [body @ .., b'*', hi, lo] => match hex_byte(*hi, *lo) {
            Some(expected) => (body, Some(expected)),
            None => (line, None),
        },
        _ => (line, None),
    }
}

/// Decodes a sentence as it comes out of the framer, `$` through CR LF. Any talker is
/// accepted. A checksum, when present, must match.
pub fn parse(s: &[u8]) -> Result<Message, Error<'_>> {
    let line = match s {
        [b'$', line @ .., b'\r', b'\n'] => line,
        [b'$', ..] => return Err(Error::Truncated),
        _ => return Err(Error::InvalidFrame),
    };
    let (body, expected) = split_checksum(line);
    if let Some(expected) = expected {
        let actual = checksum(body);
        if expected != actual {
            return Err(Error::ChecksumMismatch { expected, actual });
        }
    }
    Ok(message(core::str::from_utf8(body)?)?.1)
}
