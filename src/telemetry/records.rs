//! Raw, unscaled GPMF sensor records.

use binrw::BinRead;

/// Single `GPS5` struct, 20 bytes.
#[derive(Debug, Default, Clone, Copy, BinRead)]
#[br(big)]
pub struct Gps5Record {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
    pub speed_2d: i32,
    pub speed_3d: i32,
}

/// Single `GPS9` struct, 32 bytes.
#[derive(Debug, Default, Clone, Copy, BinRead)]
#[br(big)]
pub struct Gps9Record {
    pub latitude: i32,
    pub longitude: i32,
    pub altitude: i32,
    pub speed_2d: i32,
    pub speed_3d: i32,
    /// Unscaled.
    pub days_since_2000: i32,
    pub seconds_since_midnight: i32,
    pub dop: u16,
    /// Unscaled.
    pub fix: u16,
}

/// Single `MAGN` struct, 6 bytes.
#[derive(Debug, Default, Clone, Copy, BinRead)]
#[br(big)]
pub struct MagnRecord {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}
