//! Various MP4 and GPMF telemetry related errors.

use std::fmt;

/// Various MP4/GPMF related read/parse errors.
#[derive(Debug)]
pub enum TelemetryError {
    /// Converted `BinResult` error.
    BinReadError(binrw::Error),
    /// Converted `FromUtf8Error`.
    Utf8Error(std::string::FromUtf8Error),
    /// Converted `TryFromIntError`.
    TryFromIntError(std::num::TryFromIntError),
    /// IO error
    IOError(std::io::Error),
    /// Short read, e.g. end of data reached.
    ReadMismatch{got: u64, expected: u64},
    /// Position out of bounds, `(POSITION, MIN, MAX)`.
    BoundsError(u64, u64, u64),
    /// Atom size can not hold its own header,
    /// or exceeds the remaining source.
    UnexpectedAtomSize{name: String, size: u64, offset: u64},
    /// No track with a GPMF sample description.
    NoMetadataTrack,
    /// Metadata track found, but no payloads could be located.
    NoPayloads,
    /// `GPSU` value not formatted as `YYMMDDhhmmss.mmm`.
    InvalidGpsu(String),
    /// GPMF nesting exceeds max depth.
    NestLimitExceeded(usize),
}

impl std::error::Error for TelemetryError {}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::BinReadError(err) => write!(f, "{err}"),
            TelemetryError::Utf8Error(err) => write!(f, "{err}"),
            TelemetryError::TryFromIntError(err) => write!(f, "{err}"),
            TelemetryError::IOError(err) => write!(f, "IO error: {}", err),
            TelemetryError::ReadMismatch{got, expected} => write!(f, "Read {got} bytes, expected {expected} bytes."),
            TelemetryError::BoundsError(pos, min, max) => write!(f, "Bounds error: position {pos} outside {min}..{max}."),
            TelemetryError::UnexpectedAtomSize{name, size, offset} => write!(f, "Unexpected size {size} for atom '{name}' @ offset {offset}."),
            TelemetryError::NoMetadataTrack => write!(f, "No GPMF metadata track found."),
            TelemetryError::NoPayloads => write!(f, "No GPMF payloads could be located."),
            TelemetryError::InvalidGpsu(s) => write!(f, "Invalid GPSU timestamp '{s}', expected 'YYMMDDhhmmss.mmm'."),
            TelemetryError::NestLimitExceeded(max) => write!(f, "GPMF nesting exceeds max depth {max}."),
        }
    }
}

/// Converts std::io::Error to TelemetryError
impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::IOError(err)
    }
}

/// Converts std::string::FromUtf8Error to TelemetryError
impl From<std::string::FromUtf8Error> for TelemetryError {
    fn from(err: std::string::FromUtf8Error) -> TelemetryError {
        TelemetryError::Utf8Error(err)
    }
}

/// Converts std::num::TryFromIntError to TelemetryError
impl From<std::num::TryFromIntError> for TelemetryError {
    fn from(err: std::num::TryFromIntError) -> TelemetryError {
        TelemetryError::TryFromIntError(err)
    }
}

/// Converts TelemetryError to std::io::Error
impl From<TelemetryError> for std::io::Error {
    fn from(err: TelemetryError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err)
    }
}

/// Converts binrw::Error to TelemetryError
impl From<binrw::Error> for TelemetryError {
    fn from(err: binrw::Error) -> TelemetryError {
        TelemetryError::BinReadError(err)
    }
}
