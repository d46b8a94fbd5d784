use nom::{
    IResult, Parser,
    character::complete::{char, satisfy},
    combinator::opt,
    sequence::terminated,
};

use chrono::{NaiveDate, NaiveTime};

use crate::parser::{date_dmy, skip_field, time_hms_nano};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub struct RmcData {
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub time: Option<NaiveTime>,
    /// Status `A`, the receiver reports a valid position.
    pub active: bool,
    #[cfg_attr(feature = "defmt", defmt(Debug2Format))]
    pub date: Option<NaiveDate>,
}

pub fn rmc(i: &str) -> IResult<&str, RmcData> {
    let (i, time) = terminated(opt(time_hms_nano), char(',')).parse(i)?;
    let (i, status) = terminated(opt(satisfy(|c| c != ',')), char(',')).parse(i)?;
    let mut i = i;
    // lat, NS, lon, EW, spd, cog
    for _ in 0..6 {
        (i, _) = skip_field(i)?;
    }
    let (i, date) = terminated(opt(date_dmy), char(',')).parse(i)?;
    Ok((
        i,
        RmcData {
            time,
            active: status == Some('A'),
            date,
        },
    ))
}
