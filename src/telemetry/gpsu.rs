//! GPS UTC timestamp (`GPSU`).

use time::{Date, Month, PrimitiveDateTime, Time};

use crate::TelemetryError;

use super::Timestamp;

/// Length of a `GPSU` value, `YYMMDDhhmmss.mmm`.
pub const GPSU_LEN: usize = 16;

/// Parses a `GPSU` value, `YYMMDDhhmmss.mmm`, as UTC.
/// Years are offset by 2000.
///
/// Field widths are fixed: anything but exactly 12 digits,
/// a period, then 3 digits is an error.
pub fn parse_gpsu(value: &str) -> Result<Timestamp, TelemetryError> {
    let err = || TelemetryError::InvalidGpsu(value.to_owned());

    let bytes = value.as_bytes();
    if bytes.len() != GPSU_LEN || bytes[12] != b'.' {
        return Err(err())
    }

    // Two or three digits at fixed offset
    let field = |start: usize, len: usize| -> Result<u16, TelemetryError> {
        bytes[start .. start + len].iter()
            .try_fold(0_u16, |acc, b| match b {
                b'0'..=b'9' => Ok(acc * 10 + (b - b'0') as u16),
                _ => Err(err()),
            })
    };

    let year = 2000 + field(0, 2)? as i32;
    let month = Month::try_from(field(2, 2)? as u8).map_err(|_| err())?;
    let day = field(4, 2)? as u8;
    let hour = field(6, 2)? as u8;
    let minute = field(8, 2)? as u8;
    let second = field(10, 2)? as u8;
    let milli = field(13, 3)?;

    let date = Date::from_calendar_date(year, month, day).map_err(|_| err())?;
    let time = Time::from_hms_milli(hour, minute, second, milli).map_err(|_| err())?;

    Ok(PrimitiveDateTime::new(date, time).assume_utc())
}
