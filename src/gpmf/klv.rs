//! Single GPMF Key-Length-Value entry.
//!
//! ```ignore
//! | [K K K K] [T] [S] [R R] [D D D D ...] |
//!    |         |   |   |     |
//!    |         |   |   |     data, struct size x repeat bytes, padded to 4 byte boundary
//!    |         |   |   repeat, big endian u16
//!    |         |   struct size in bytes
//!    |         type code, 0 for nested entries
//!    FourCC key
//! ```

use std::io::Cursor;

use binrw::{BinRead, BinReaderExt};

use crate::{support::string_from_bytes, TelemetryError};

/// Header size in bytes.
pub const KLV_HEADER_SIZE: usize = 8;

/// Returns `true` if every byte is an ASCII letter, digit, or space.
/// All zero keys are padding, not entries.
pub fn is_valid_key(key: &[u8]) -> bool {
    key.len() == 4
        && key.iter().all(|b| b.is_ascii_alphanumeric() || *b == b' ')
        && key.iter().any(|b| *b != b' ')
}

/// Entry header.
#[derive(Debug, Default, Clone, Copy, BinRead)]
#[br(big)]
struct KlvHeader {
    key: [u8; 4],
    type_code: u8,
    struct_size: u8,
    repeat: u16,
}

/// View into a single GPMF entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Klv<'a> {
    /// FourCC key, e.g. `GPS5`.
    pub key: [u8; 4],
    /// Type code, e.g. `l` for `i32`, `0` for nested entries.
    pub type_code: u8,
    /// Size in bytes for a single struct.
    pub struct_size: u8,
    /// Number of structs.
    pub repeat: u16,
    /// Position of the entry header within the payload.
    pub offset: usize,
    /// Data, excluding padding.
    data: &'a [u8],
}

impl<'a> Klv<'a> {
    /// Parses the entry at position `pos` in `buf`.
    /// Returns `None` if the header or the padded data
    /// extends beyond `buf`.
    pub fn parse(buf: &'a [u8], pos: usize) -> Option<Self> {
        let raw = buf.get(pos .. pos.checked_add(KLV_HEADER_SIZE)?)?;
        let KlvHeader { key, type_code, struct_size, repeat } = KlvHeader::read(&mut Cursor::new(raw)).ok()?;

        let data_start = pos + KLV_HEADER_SIZE;
        let data_size = struct_size as usize * repeat as usize;
        let padded = (data_size + 3) & !3;
        if data_start + padded > buf.len() {
            return None
        }

        Some(Self {
            key,
            type_code,
            struct_size,
            repeat,
            offset: pos,
            data: &buf[data_start .. data_start + data_size],
        })
    }

    /// Key as single-byte chars.
    pub fn key_str(&self) -> String {
        string_from_bytes(&self.key, false)
    }

    /// Type code 0: data consists of other entries.
    pub fn is_nested(&self) -> bool {
        self.type_code == 0
    }

    /// Data size in bytes, excluding padding.
    pub fn data_size(&self) -> usize {
        self.struct_size as usize * self.repeat as usize
    }

    /// Data size in bytes, including padding.
    pub fn padded_size(&self) -> usize {
        (self.data_size() + 3) & !3
    }

    /// Data size in 32-bit words, including padding.
    pub fn words(&self) -> usize {
        self.padded_size() / 4
    }

    /// Data, excluding padding.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Iterates over the `repeat` structs.
    pub fn structs(&self) -> impl Iterator<Item = &'a [u8]> {
        self.data.chunks_exact(self.struct_size.max(1) as usize)
    }

    /// Reads all data as big endian values of type `T`,
    /// ignoring trailing bytes that do not fill a whole value.
    pub fn values<T>(&self) -> Result<Vec<T>, TelemetryError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        let count = self.data.len() / std::mem::size_of::<T>().max(1);
        let mut cursor = Cursor::new(self.data);
        (0..count)
            .map(|_| cursor.read_be::<T>().map_err(TelemetryError::from))
            .collect()
    }

    /// Reads the first big endian value of type `T`.
    pub fn first<T>(&self) -> Result<T, TelemetryError>
    where
        T: BinRead,
        <T as BinRead>::Args<'static>: Sized + Clone + Default,
    {
        Ok(Cursor::new(self.data).read_be::<T>()?)
    }

    /// Data as single-byte chars, with NUL bytes removed.
    pub fn string(&self) -> String {
        string_from_bytes(self.data, true)
    }
}
