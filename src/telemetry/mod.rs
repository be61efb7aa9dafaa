//! GPS and magnetometer telemetry from GoPro MP4 files.
//!
//! ```rs
//! use mp4telemetry::Telemetry;
//! use std::path::Path;
//!
//! fn main() -> Result<(), mp4telemetry::TelemetryError> {
//!     let telemetry = Telemetry::from_path(Path::new("GOPRO.MP4"))?;
//!
//!     println!("{:?}", telemetry.device_name);
//!     for location in telemetry.locations.iter() {
//!         println!("{:?} {} {}", location.time, location.lat, location.lon);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod decoder;
mod gpsu;
mod options;
mod records;
mod sample;

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use log::{debug, warn};
use time::{format_description::well_known::Rfc3339, Duration};

pub use decoder::{decode_payload, yaw_from_magnetometer, Accumulator};
pub use gpsu::parse_gpsu;
pub use options::DecoderOptions;
pub use records::{Gps5Record, Gps9Record, MagnRecord};
pub use sample::{AttitudeSample, GpsFix, LocationSample, Timestamp};

use crate::{Mp4, MovieInfo, TelemetryError};

/// Telemetry decoded from a single file.
#[derive(Debug, Default, Clone)]
pub struct Telemetry {
    /// File name, if decoded via `Telemetry::from_path()`.
    pub file_name: Option<String>,
    /// First device name (`DVNM`).
    pub device_name: Option<String>,
    /// First device id (`DVID`).
    pub device_id: Option<u32>,
    /// First `GPSU` timestamp.
    pub start_time: Option<Timestamp>,
    /// GPS samples, in file order.
    pub locations: Vec<LocationSample>,
    /// Magnetometer derived samples, in file order.
    pub attitudes: Vec<AttitudeSample>,
    /// Movie timing.
    pub movie: MovieInfo,
    /// Distinct GPMF keys, in the order first encountered.
    pub keys: Vec<String>,
}

impl Telemetry {
    /// Decodes telemetry from file at `path`, using default options.
    pub fn from_path(path: &Path) -> Result<Self, TelemetryError> {
        Self::from_path_with_options(path, &DecoderOptions::default())
    }

    /// Decodes telemetry from file at `path`.
    pub fn from_path_with_options(path: &Path, options: &DecoderOptions) -> Result<Self, TelemetryError> {
        let file = File::open(path)?;
        let mut telemetry = Self::from_reader_with_options(BufReader::new(file), options)?;
        telemetry.file_name = path.file_name()
            .map(|name| name.to_string_lossy().to_string());
        Ok(telemetry)
    }

    /// Decodes telemetry from a finite, seekable byte source,
    /// using default options.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, TelemetryError> {
        Self::from_reader_with_options(reader, &DecoderOptions::default())
    }

    /// Decodes telemetry from a finite, seekable byte source.
    ///
    /// Returns an error only if the atom framing can not be read
    /// (or, if `options.require_metadata_track` is set, if there is no telemetry).
    /// Payloads that can not be read or decoded are logged and skipped.
    pub fn from_reader_with_options<R: Read + Seek>(
        reader: R,
        options: &DecoderOptions,
    ) -> Result<Self, TelemetryError> {
        let mut mp4 = Mp4::from_reader(reader)?;
        let layout = mp4.walk(options)?;

        let mut telemetry = Self {
            movie: layout.movie,
            ..Self::default()
        };

        let Some(tables) = layout.metadata else {
            if options.require_metadata_track {
                return Err(TelemetryError::NoMetadataTrack)
            }
            warn!("No GPMF track in {} tracks.", layout.tracks);
            return Ok(telemetry)
        };

        let locations = tables.payload_locations();
        if locations.is_empty() {
            if options.require_metadata_track {
                return Err(TelemetryError::NoPayloads)
            }
            warn!("GPMF track found, but no payloads could be located.");
            return Ok(telemetry)
        }

        let mut acc = Accumulator::default();
        for (index, location) in locations.iter().enumerate() {
            let payload = match mp4.payload(location) {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(err) => {
                    warn!("Failed to read payload {index} @ {}: {err}", location.offset);
                    continue
                }
            };
            let window = tables.payload_window(index, telemetry.movie.time_scale);
            if let Err(err) = decode_payload(&payload, window, &mut acc, &mut telemetry, options) {
                warn!("Payload {index} @ {}: {err}", location.offset);
            }
        }

        telemetry.finalize_attitudes();
        telemetry.log_summary();

        Ok(telemetry)
    }

    /// Sets absolute time for attitude samples
    /// as start time plus offset, `None` if out of range.
    pub(crate) fn finalize_attitudes(&mut self) {
        let start = self.start_time;
        for attitude in self.attitudes.iter_mut() {
            attitude.time = start.and_then(|t| t.checked_add(attitude.offset_from_base));
        }
    }

    /// Time between first and last timestamped GPS sample.
    pub fn location_span(&self) -> Option<Duration> {
        let first = self.locations.iter().find_map(|l| l.time)?;
        let last = self.locations.iter().rev().find_map(|l| l.time)?;
        Some(last - first)
    }

    /// Time between first and last timestamped attitude sample.
    pub fn attitude_span(&self) -> Option<Duration> {
        let first = self.attitudes.iter().find_map(|a| a.time)?;
        let last = self.attitudes.iter().rev().find_map(|a| a.time)?;
        Some(last - first)
    }

    fn log_summary(&self) {
        let fmt = |t: Option<Timestamp>| t
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_else(|| String::from("n/a"));

        debug!("Video length: {}", self.movie.video_length);
        debug!("GPS: {} samples over {:?}, {} to {}",
            self.locations.len(),
            self.location_span(),
            fmt(self.locations.first().and_then(|l| l.time)),
            fmt(self.locations.last().and_then(|l| l.time)),
        );
        debug!("MAGN: {} samples over {:?}, {} to {}",
            self.attitudes.len(),
            self.attitude_span(),
            fmt(self.attitudes.first().and_then(|a| a.time)),
            fmt(self.attitudes.last().and_then(|a| a.time)),
        );
    }
}
