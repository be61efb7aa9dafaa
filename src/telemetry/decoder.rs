//! Decodes the sensor values in a single GPMF payload.
//!
//! Some values apply to the records that follow them,
//! within the same and later payloads: scale divisors (`SCAL`),
//! precision (`GPSP`), fix (`GPSF`) and the UTC anchor (`GPSU`).
//! These are held in an `Accumulator` that the caller
//! passes along from payload to payload.

use std::io::Cursor;

use binrw::BinRead;
use log::{debug, warn};
use time::Duration;

use crate::{
    consts::{gps_time_zero, GPS5, GPS9, GPSF, GPSP, GPSU, MAGN, SCAL},
    gpmf::{GpmfCursor, Klv},
    DecoderOptions,
    TelemetryError,
};

use super::{
    gpsu::{parse_gpsu, GPSU_LEN},
    records::{Gps5Record, Gps9Record, MagnRecord},
    AttitudeSample,
    GpsFix,
    LocationSample,
    Telemetry,
    Timestamp,
};

/// State carried over from one payload to the next.
#[derive(Debug, Default, Clone)]
pub struct Accumulator {
    /// Scale divisors from the last `SCAL`, in declaration order.
    pub divisors: Vec<i32>,
    /// Raw dilution of precision from the last `GPSP`.
    pub dop: u16,
    /// Fix from the last `GPSF`.
    pub fix: GpsFix,
    /// Running UTC clock for `GPS5` records.
    pub utc: Option<Timestamp>,
    /// A `GPS9` record has been seen,
    /// `GPS5` records are ignored from here on.
    pub has_gps9: bool,
}

impl Accumulator {
    /// Divisor at `index` as float. `0` is read as `1`.
    fn divisor(&self, index: usize) -> f64 {
        match self.divisors.get(index) {
            Some(0) | None => 1.0,
            Some(d) => *d as f64,
        }
    }

    /// Advances the UTC clock. A clock that would leave the
    /// representable range is cleared until the next `GPSU`.
    fn advance_utc(&mut self, seconds: f64) -> Option<Timestamp> {
        if let Some(utc) = self.utc {
            self.utc = offset_time(utc, seconds);
            if self.utc.is_none() {
                warn!("UTC clock out of range after advancing {seconds} s, cleared until next GPSU.");
            }
        }
        self.utc
    }
}

/// Returns `time` shifted by `seconds`,
/// or `None` if the result is out of range.
pub(crate) fn offset_time(time: Timestamp, seconds: f64) -> Option<Timestamp> {
    time.checked_add(Duration::checked_seconds_f64(seconds)?)
}

/// Absolute time for a `GPS9` record.
fn gps9_time(days_since_2000: i32, seconds_since_midnight: f64) -> Option<Timestamp> {
    let midnight = gps_time_zero().checked_add(Duration::days(days_since_2000 as i64))?;
    offset_time(midnight, seconds_since_midnight)
}

/// Yaw in degrees, `0.0..360.0`, from magnetometer X and Y,
/// relative to the reference `center`.
pub fn yaw_from_magnetometer(x: f64, y: f64, center: (f64, f64)) -> f64 {
    let x_norm = x - center.0;
    let y_norm = -(y - center.1);
    (y_norm.atan2(x_norm).to_degrees() + 360.0) % 360.0
}

/// Decodes a single payload, appending samples to `telemetry`.
///
/// `window` is the payload's `(IN, OUT)` time window in seconds,
/// used to interpolate time for repeated `MAGN` and `GPS5` structs.
///
/// Entries that can not be decoded are logged and skipped.
/// An error is only returned if the payload's nesting is too deep,
/// in which case samples decoded up until that point are kept.
pub fn decode_payload(
    payload: &[u8],
    window: (f64, f64),
    acc: &mut Accumulator,
    telemetry: &mut Telemetry,
    options: &DecoderOptions,
) -> Result<(), TelemetryError> {
    let mut cursor = GpmfCursor::new(payload);

    for klv in cursor.by_ref() {
        let key = klv.key_str();
        if !telemetry.keys.contains(&key) {
            telemetry.keys.push(key);
        }

        let result = match klv.key {
            GPSP => klv.first::<u16>().map(|dop| acc.dop = dop),
            GPSF => klv.first::<u32>().map(|fix| acc.fix = GpsFix::from(fix)),
            SCAL => decode_scal(&klv, acc),
            GPSU => decode_gpsu(&klv, acc, telemetry),
            MAGN => decode_magn(&klv, window, telemetry, options),
            GPS9 => decode_gps9(&klv, acc, telemetry),
            GPS5 => decode_gps5(&klv, window, acc, telemetry, options),
            _ => Ok(()),
        };

        if let Err(err) = result {
            warn!("Failed to decode {} @ {}: {err}", klv.key_str(), klv.offset);
        }
    }

    if let Some(id) = cursor.device_id() {
        telemetry.device_id.get_or_insert(id);
    }
    if let Some(name) = cursor.device_name() {
        if telemetry.device_name.is_none() {
            telemetry.device_name = Some(name.to_owned());
        }
    }

    match cursor.take_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn decode_scal(klv: &Klv, acc: &mut Accumulator) -> Result<(), TelemetryError> {
    acc.divisors = match klv.struct_size {
        4 => klv.values::<i32>()?,
        2 => klv.values::<i16>()?.into_iter().map(i32::from).collect(),
        size => {
            warn!("SCAL @ {} has unsupported struct size {size}, ignoring.", klv.offset);
            return Ok(())
        }
    };
    Ok(())
}

fn decode_gpsu(klv: &Klv, acc: &mut Accumulator, telemetry: &mut Telemetry) -> Result<(), TelemetryError> {
    if klv.struct_size as usize != GPSU_LEN {
        return Ok(())
    }
    let raw = klv.data().get(..GPSU_LEN).unwrap_or_default();
    let value = String::from_utf8(raw.to_vec())?;
    let utc = parse_gpsu(&value)?;
    acc.utc = Some(utc);
    telemetry.start_time.get_or_insert(utc);
    Ok(())
}

fn decode_magn(
    klv: &Klv,
    window: (f64, f64),
    telemetry: &mut Telemetry,
    options: &DecoderOptions,
) -> Result<(), TelemetryError> {
    if klv.repeat == 0 {
        return Ok(())
    }
    let (t_in, t_out) = window;
    let increment = (t_out - t_in) / klv.repeat as f64;

    for (i, raw) in klv.structs().enumerate() {
        let magn = MagnRecord::read(&mut Cursor::new(raw))?;
        let yaw = yaw_from_magnetometer(magn.x as f64, magn.y as f64, options.magnetometer_center);
        telemetry.attitudes.push(AttitudeSample {
            time: None,
            offset_from_base: Duration::saturating_seconds_f64(t_in + increment * i as f64),
            yaw: Some(yaw),
            pitch: None,
            roll: None,
        });
    }

    Ok(())
}

fn decode_gps9(klv: &Klv, acc: &mut Accumulator, telemetry: &mut Telemetry) -> Result<(), TelemetryError> {
    if klv.repeat == 0 {
        return Ok(())
    }
    if acc.divisors.len() < 8 {
        warn!("GPS9 @ {}: expected at least 8 scale divisors, found {}. Skipping.",
            klv.offset, acc.divisors.len());
        return Ok(())
    }

    // GPS9 supersedes GPS5 for the entire file
    if !acc.has_gps9 {
        acc.has_gps9 = true;
        if !telemetry.locations.is_empty() {
            debug!("GPS9 found, discarding {} GPS5 samples.", telemetry.locations.len());
            telemetry.locations.clear();
        }
    }

    for raw in klv.structs() {
        let gps = Gps9Record::read(&mut Cursor::new(raw))?;
        let seconds = gps.seconds_since_midnight as f64 / acc.divisor(6);
        let Some(time) = gps9_time(gps.days_since_2000, seconds) else {
            warn!("GPS9 @ {}: day {} + {seconds} s out of range. Skipping record.",
                klv.offset, gps.days_since_2000);
            continue
        };
        telemetry.locations.push(LocationSample {
            time: Some(time),
            lat: gps.latitude as f64 / acc.divisor(0),
            lon: gps.longitude as f64 / acc.divisor(1),
            alt: gps.altitude as f64 / acc.divisor(2),
            ground_speed: gps.speed_2d as f64 / acc.divisor(3),
            virtual_speed: gps.speed_3d as f64 / acc.divisor(4),
            hdop: (gps.dop as f64 / acc.divisor(7)) as i32,
            fix: GpsFix::from(gps.fix as u32),
        });
    }

    Ok(())
}

fn decode_gps5(
    klv: &Klv,
    window: (f64, f64),
    acc: &mut Accumulator,
    telemetry: &mut Telemetry,
    options: &DecoderOptions,
) -> Result<(), TelemetryError> {
    if acc.has_gps9 || klv.repeat == 0 {
        return Ok(())
    }
    if acc.divisors.len() < 5 {
        warn!("GPS5 @ {}: expected at least 5 scale divisors, found {}. Skipping.",
            klv.offset, acc.divisors.len());
        return Ok(())
    }

    let (t_in, t_out) = window;
    let increment = (t_out - t_in) / klv.repeat as f64;

    if acc.dop > options.dop_threshold {
        debug!("GPS5 @ {}: DOP {} above {}, dropping {} samples.",
            klv.offset, acc.dop, options.dop_threshold, klv.repeat);
        acc.advance_utc(increment);
        return Ok(())
    }

    for raw in klv.structs() {
        let gps = Gps5Record::read(&mut Cursor::new(raw))?;

        // The first sample takes the anchor as is,
        // later ones are spaced by the increment.
        let follows_timed = telemetry.locations.last()
            .is_some_and(|loc| loc.time.is_some());
        let time = match follows_timed {
            true => acc.advance_utc(increment),
            false => acc.utc,
        };

        telemetry.locations.push(LocationSample {
            time,
            lat: gps.latitude as f64 / acc.divisor(0),
            lon: gps.longitude as f64 / acc.divisor(1),
            alt: gps.altitude as f64 / acc.divisor(2),
            ground_speed: gps.speed_2d as f64 / acc.divisor(3),
            virtual_speed: gps.speed_3d as f64 / acc.divisor(4),
            hdop: acc.dop as i32,
            fix: acc.fix,
        });
    }

    Ok(())
}
