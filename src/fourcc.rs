//! MP4 atom FourCC.
//! See https://developer.apple.com/library/archive/documentation/QuickTime/QTFF/QTFFChap2/qtff2.html#//apple_ref/doc/uid/TP40000939-CH204-56313.
//! Only atoms required to locate timed GPMF telemetry are named,
//! everything else is `FourCC::Custom`.

use std::fmt;

use crate::support::string_from_bytes;

/// MP4 atom Four CC.
#[derive(Debug, Clone, PartialEq)]
pub enum FourCC {
    /// Edit atom
    Edts,
    /// Edit list atom, inside `edts`
    Elst,
    /// Handler reference atom
    Hdlr,
    /// Media data atom
    Mdat,
    /// Media header atom
    Mdhd,
    Mdia,
    Minf,
    /// Movie Atom
    Moov,
    /// Movie Header Atom
    Mvhd,
    /// Sample table atom
    Stbl,
    /// Chunk offset, 32-bit values
    Stco,
    /// Sample to chunk
    Stsc,
    /// Sample description
    Stsd,
    /// Sample size
    Stsz,
    /// Time to sample
    Stts,
    /// Track description
    Trak,

    Custom(String)
}

impl FourCC {
    pub fn from_slice(fourcc: &[u8]) -> Self {
        match fourcc {
            b"edts" => Self::Edts,
            b"elst" => Self::Elst,
            b"hdlr" => Self::Hdlr,
            b"mdat" => Self::Mdat,
            b"mdhd" => Self::Mdhd,
            b"mdia" => Self::Mdia,
            b"minf" => Self::Minf,
            b"moov" => Self::Moov,
            b"mvhd" => Self::Mvhd,
            b"stbl" => Self::Stbl,
            b"stco" => Self::Stco,
            b"stsc" => Self::Stsc,
            b"stsd" => Self::Stsd,
            b"stsz" => Self::Stsz,
            b"stts" => Self::Stts,
            b"trak" => Self::Trak,
            // Bytes read as ISO8859-1, since some vendors exceed ASCII
            _ => Self::Custom(string_from_bytes(fourcc, false)),
        }
    }

    pub fn from_u32(value: u32) -> Self {
        Self::from_slice(&value.to_be_bytes())
    }

    pub fn to_str(&self) -> &str {
        match self {
            Self::Edts => "edts",
            Self::Elst => "elst",
            Self::Hdlr => "hdlr",
            Self::Mdat => "mdat",
            Self::Mdhd => "mdhd",
            Self::Mdia => "mdia",
            Self::Minf => "minf",
            Self::Moov => "moov",
            Self::Mvhd => "mvhd",
            Self::Stbl => "stbl",
            Self::Stco => "stco",
            Self::Stsc => "stsc",
            Self::Stsd => "stsd",
            Self::Stsz => "stsz",
            Self::Stts => "stts",
            Self::Trak => "trak",
            Self::Custom(s) => s.as_str()
        }
    }
}

impl Default for FourCC {
    fn default() -> Self {
        Self::Custom("None".to_owned())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}
