use crate::{Error, message_id, write_frame};

/// Where the receiver keeps a setting.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Attributes {
    #[default]
    Sram = 0,
    SramAndFlash = 1,
}

/// Output interval of each NMEA sentence in seconds, `0` turns a sentence off.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NmeaIntervals {
    pub gga: u8,
    pub gsa: u8,
    pub gsv: u8,
    pub gll: u8,
    pub rmc: u8,
    pub vtg: u8,
    pub zda: u8,
}

impl NmeaIntervals {
    /// GGA and RMC every second, nothing else.
    pub const FIX_ONLY: Self = Self {
        gga: 1,
        gsa: 0,
        gsv: 0,
        gll: 0,
        rmc: 1,
        vtg: 0,
        zda: 0,
    };
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PpsMode {
    Off = 0,
    /// Pulse once a 3D fix is available.
    Fix3d = 1,
    /// Pulse as soon as one satellite is tracked.
    OneSatellite = 2,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerMode {
    Normal = 0,
    PowerSave = 1,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Nmea(NmeaIntervals),
    Power(PowerMode),
    /// Position updates per second.
    UpdateRate(u8),
    Pps(PpsMode),
}

impl Command {
    pub const fn id(&self) -> u8 {
        match self {
            Command::Nmea(_) => message_id::CONFIGURE_NMEA,
            Command::Power(_) => message_id::CONFIGURE_POWER,
            Command::UpdateRate(_) => message_id::CONFIGURE_UPDATE_RATE,
            Command::Pps(_) => message_id::CONFIGURE_PPS,
        }
    }

    /// Encodes the command as a frame into `buf`.
    pub fn encode<'a>(&self, attributes: Attributes, buf: &'a mut [u8]) -> Result<&'a [u8], Error> {
        let attributes = attributes as u8;
        match *self {
            Command::Nmea(i) => write_frame(
                buf,
                self.id(),
                &[i.gga, i.gsa, i.gsv, i.gll, i.rmc, i.vtg, i.zda, attributes],
            ),
            Command::Power(mode) => write_frame(buf, self.id(), &[mode as u8, attributes]),
            Command::UpdateRate(rate) => write_frame(buf, self.id(), &[rate, attributes]),
            Command::Pps(mode) => write_frame(buf, self.id(), &[mode as u8, attributes]),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use crate::command::*;

    #[test]
    fn test_nmea() {
        let mut buf = [0; 32];
        assert_eq!(
            Command::Nmea(NmeaIntervals::FIX_ONLY).encode(Attributes::Sram, &mut buf),
            Ok(&[
                0xa0, 0xa1, 0x00, 0x09, 0x08, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x08,
                0x0d, 0x0a
            ][..])
        );
    }

    #[test]
    fn test_update_rate_and_pps() {
        let mut buf = [0; 32];
        assert_eq!(
            Command::UpdateRate(1).encode(Attributes::Sram, &mut buf),
            Ok(&[0xa0, 0xa1, 0x00, 0x03, 0x0e, 0x01, 0x00, 0x0f, 0x0d, 0x0a][..])
        );
        assert_eq!(
            Command::Pps(PpsMode::Fix3d).encode(Attributes::Sram, &mut buf),
            Ok(&[0xa0, 0xa1, 0x00, 0x03, 0x3e, 0x01, 0x00, 0x3f, 0x0d, 0x0a][..])
        );
        assert_eq!(
            Command::Power(PowerMode::PowerSave).encode(Attributes::SramAndFlash, &mut buf),
            Ok(&[0xa0, 0xa1, 0x00, 0x03, 0x0c, 0x01, 0x01, 0x0c, 0x0d, 0x0a][..])
        );
    }

    #[test]
    fn test_small_buffer() {
        let mut buf = [0; 12];
        assert_eq!(
            Command::Nmea(NmeaIntervals::default()).encode(Attributes::Sram, &mut buf),
            Err(Error::BufferTooSmall(16))
        );
    }
}
