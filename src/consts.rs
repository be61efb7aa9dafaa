use time::{Date, Month, OffsetDateTime};

/// FourCC:s for atoms that are decoded or descended into.
/// Anything else is skipped using its declared size.
///
/// - `moov`: offset tables, timing, metadata, telemetry
/// - `mvhd`: movie time scale and duration
/// - `trak`: moov.trak (multiple)
/// - `mdia`: moov.trak.mdia
/// - `mdhd`: track time scale, duration, creation time
/// - `minf`: moov.trak.mdia.minf
/// - `stsd`: sample description, identifies `gpmd` tracks
/// - `stbl`: moov.trak.mdia.minf.stbl, contains the sample tables below
/// - `stts`: time to sample
/// - `stsc`: sample to chunk
/// - `stsz`: sample sizes
/// - `stco`: chunk offsets (32-bit)
/// - `hdlr`: handler type
/// - `edts`: edit list container, only `elst` is read
pub const ALLOWED: [&'static str; 14] = [
    "moov",
    "mvhd",
    "trak",
    "mdia",
    "mdhd",
    "minf",
    "stsd",
    "stbl",
    "stts",
    "stsc",
    "stsz",
    "stco",
    "hdlr",
    "edts",
];

/// FourCC:s for allow-listed "container" atoms.
/// These are nested and contain more atoms
/// within their specified, total size.
///
/// Note that `edts` is not listed, since its single
/// `elst` child is read as part of `edts` itself.
pub const CONTAINER: [&'static str; 5] = [
    "moov",
    "trak",
    "mdia",
    "minf",
    "stbl",
];

/// Handler type for timed metadata tracks (`hdlr`).
pub const HANDLER_META: [u8; 4] = *b"meta";
/// Sample description format for GoPro GPMF (`stsd`).
pub const FORMAT_GPMD: [u8; 4] = *b"gpmd";

/// Max number of tracks counted.
pub const MAX_TRACKS: usize = 16;
/// Max GPMF nesting depth.
pub const NEST_LIMIT: usize = 16;

/// Raw `GPSP` values above this are considered unreliable.
pub const DOP_THRESHOLD: u16 = 999;
/// Reference center for magnetometer X and Y axes.
pub const MAGNETOMETER_CENTER: (f64, f64) = (156.23, 21.3);

/// Time zero for MP4 containers. Midnight January 1, 1904 UTC.
pub fn mp4_time_zero() -> OffsetDateTime {
    Date::from_calendar_date(1904, Month::January, 1)
        .map(|d| d.midnight().assume_utc())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Time zero for `GPS9` day counts. Midnight January 1, 2000 UTC.
pub fn gps_time_zero() -> OffsetDateTime {
    Date::from_calendar_date(2000, Month::January, 1)
        .map(|d| d.midnight().assume_utc())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// GPMF device data container, top of each payload's nest.
pub const DEVC: [u8; 4] = *b"DEVC";
/// GPMF device id.
pub const DVID: [u8; 4] = *b"DVID";
/// GPMF device name.
pub const DVNM: [u8; 4] = *b"DVNM";
/// GPS dilution of precision x 100.
pub const GPSP: [u8; 4] = *b"GPSP";
/// GPS fix, 0, 2 or 3.
pub const GPSF: [u8; 4] = *b"GPSF";
/// Scale divisors for the next numeric sibling.
pub const SCAL: [u8; 4] = *b"SCAL";
/// GPS UTC time, `YYMMDDhhmmss.mmm`.
pub const GPSU: [u8; 4] = *b"GPSU";
/// Raw magnetometer samples.
pub const MAGN: [u8; 4] = *b"MAGN";
/// GPS record, 5 fields (older devices).
pub const GPS5: [u8; 4] = *b"GPS5";
/// GPS record, 9 fields, incl. time and fix per record.
pub const GPS9: [u8; 4] = *b"GPS9";
