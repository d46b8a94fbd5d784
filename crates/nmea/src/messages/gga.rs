use nom::{IResult, Parser, character::complete::char, combinator::opt, sequence::terminated};

use chrono::NaiveTime;

use crate::parser::{number, skip_field, time_hms_nano};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub struct GgaData {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub time: Option<NaiveTime>,
    /// Fix quality, 0 when there is no fix.
    pub quality: u8,
    /// Satellites used for the fix.
    pub satellites: Option<u8>,
}

pub fn gga(i: &str) -> IResult<&str, GgaData> {
    let (i, time) = terminated(opt(time_hms_nano), char(',')).parse(i)?;
    let mut i = i;
    // lat, NS, lon, EW
    for _ in 0..4 {
        (i, _) = skip_field(i)?;
    }
    let (i, quality) = terminated(opt(number::<u8>), char(',')).parse(i)?;
    let (i, satellites) = terminated(opt(number::<u8>), char(',')).parse(i)?;
    Ok((
        i,
        GgaData {
            time,
            quality: quality.unwrap_or(0),
            satellites,
        },
    ))
}
