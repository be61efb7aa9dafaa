//! Extract GPS and magnetometer telemetry from GoPro MP4 files.
//! Does not and will not support any kind of video de/encoding.
//!
//! Decoding happens in four steps:
//! 1. The MP4 atom tree is walked to find the GPMF metadata track
//!    (handler type `meta`, sample format `gpmd`) and its sample tables.
//! 2. The sample tables are expanded into an absolute byte offset
//!    and size for every GPMF payload.
//! 3. Each payload is stepped through as nested Key-Length-Value entries.
//! 4. GPS (`GPS5`, `GPS9`) and magnetometer (`MAGN`) entries are scaled
//!    and timestamped.
//!
//! The atom layout was mostly implemented with help from
//! <https://developer.apple.com/library/archive/documentation/QuickTime/QTFF/QTFFPreface/qtffPreface.html>,
//! the GPMF layout from <https://github.com/gopro/gpmf-parser>.
//!
//! ```rs
//! use mp4telemetry::Telemetry;
//! use std::path::Path;
//!
//! fn main() -> Result<(), mp4telemetry::TelemetryError> {
//!     let telemetry = Telemetry::from_path(Path::new("GOPRO.MP4"))?;
//!
//!     println!("{:?} {:?}", telemetry.device_name, telemetry.start_time);
//!     println!("{} GPS samples", telemetry.locations.len());
//!     println!("{} magnetometer samples", telemetry.attitudes.len());
//!
//!     Ok(())
//! }
//! ```

pub mod mp4;
pub mod fourcc;
pub mod atom;
pub mod atom_types;
pub mod consts;
pub mod gpmf;
pub mod telemetry;
pub mod track;
pub mod errors;
mod support;
mod tests;

pub mod reader;

pub use mp4::{Layout, MovieInfo, Mp4};
pub use fourcc::FourCC;
pub use atom::AtomHeader;
pub use atom_types::{
    Elst,
    Hdlr,
    Mdhd,
    Mvhd,
    Stco,
    Stsc,
    Stsd,
    Stsz,
    Stts,
    SampleToChunk,
    TimeToSample,
};
pub use consts::{CONTAINER, mp4_time_zero};
pub use errors::TelemetryError;
pub use gpmf::{GpmfCursor, Klv};
pub use reader::ByteCursor;
pub use telemetry::{
    AttitudeSample,
    DecoderOptions,
    GpsFix,
    LocationSample,
    Telemetry,
    Timestamp,
};
pub use track::{payload_locations, PayloadLocation, SampleTables};
