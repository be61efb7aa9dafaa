//! Decoders for the allow-listed leaf atoms.
//!
//! Each type is parsed from an in-memory buffer holding
//! exactly the atom's data load (i.e. after the header).
//! Trailing bytes not covered by the known fields are ignored.

use std::io::Cursor;

use binrw::BinRead;

mod edts;
mod hdlr;
mod mdhd;
mod mvhd;
mod stco;
mod stsc;
mod stsd;
mod stsz;
mod stts;
mod timing;

pub use edts::{Elst, EditListEntry};
pub use hdlr::Hdlr;
pub use mdhd::Mdhd;
pub use mvhd::Mvhd;
pub use stco::Stco;
pub use stsc::{Stsc, SampleToChunk, samples_per_chunk};
pub use stsd::Stsd;
pub use stsz::Stsz;
pub use stts::{Stts, TimeToSample};
pub use timing::HeaderTiming;

/// Atoms consisting of a version/flags field,
/// an entry count, then a table of fixed size entries.
///
/// Used to verify that the declared entry count
/// fits the atom's data load, before parsing it.
pub trait EntryTable {
    /// Byte offset for the `u32` entry count,
    /// from start of data load.
    const COUNT_AT: usize = 4;
    /// Size in bytes for a single table entry.
    const ENTRY_SIZE: u64;

    /// Returns the declared number of entries,
    /// or `None` if the data load is too short to hold the count.
    fn declared_entries(data: &[u8]) -> Option<u32> {
        read_u32_at(data, Self::COUNT_AT)
    }

    /// Returns `true` if the declared table fits in `data`.
    fn fits(data: &[u8]) -> bool {
        match Self::declared_entries(data) {
            Some(n) => {
                let table_start = (Self::COUNT_AT + 4) as u64;
                table_start + n as u64 * Self::ENTRY_SIZE <= data.len() as u64
            },
            None => false,
        }
    }

    /// Total size in bytes of the samples described by a table
    /// that is not stored entry by entry, e.g. a uniform sample size.
    /// Can not exceed the source length for a valid file.
    fn described_size(_data: &[u8]) -> u64 {
        0
    }
}

/// Big endian `u32` at byte offset `pos`.
pub(crate) fn read_u32_at(data: &[u8], pos: usize) -> Option<u32> {
    let bytes = data.get(pos .. pos.checked_add(4)?)?;
    u32::read_be(&mut Cursor::new(bytes)).ok()
}
