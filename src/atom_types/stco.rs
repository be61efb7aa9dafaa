//! Chunk offset atom for file sizes below the 32bit limit (`stco`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stco`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/chunk_offset_atom>

use binrw::BinRead;

use super::EntryTable;

/// Chunk offset atom (`stco`).
///
/// Offsets are kept in file order, see `Stsz`.
#[derive(Debug, Default, BinRead, Clone)]
#[br(big)]
pub struct Stco {
    _version: u8,
    _flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    /// Chunk offset table consisting of an array of offset values.
    #[br(count = no_of_entries)]
    pub(crate) offsets: Vec<u32>
}

impl EntryTable for Stco {
    const ENTRY_SIZE: u64 = 4;
}

impl Stco {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}

impl From<Stco> for Vec<u32> {
    fn from(value: Stco) -> Self {
        value.offsets
    }
}
