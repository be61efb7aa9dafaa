//! Sample size atom (`stsz`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsz`
//!
//! Note that `stsz` lists sample size not chunk size.
//! `stco` lists chunk offsets, not offsets to individual samples.
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/sample_size_atom>

use binrw::BinRead;

use super::{read_u32_at, EntryTable};

/// Sample size atom (`stsz`).
///
/// Sizes are kept in file order. Older readers filled this table from
/// the last slot down while decrementing the entry count, then reversed it,
/// which results in the same order.
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Stsz {
    _version: u8,
    _flags: [u8; 3],
    /// Sample size.
    /// If 0 `no_of_entries` contains
    /// the number of u32 values that should be read,
    /// else all sample sizes have this value.
    pub(crate) sample_size: u32,
    pub(crate) no_of_entries: u32,
    #[br(count = no_of_entries)]
    #[br(if(sample_size == 0, vec![sample_size; no_of_entries as usize]))]
    pub(crate) sizes: Vec<u32>
}

impl EntryTable for Stsz {
    const COUNT_AT: usize = 8;
    const ENTRY_SIZE: u64 = 4;

    /// A uniform sample size carries no table.
    fn fits(data: &[u8]) -> bool {
        match (read_u32_at(data, 4), Self::declared_entries(data)) {
            (Some(0), Some(n)) => 12 + n as u64 * Self::ENTRY_SIZE <= data.len() as u64,
            (Some(_), Some(_)) => true,
            _ => false,
        }
    }

    /// Uniform sample size times sample count.
    fn described_size(data: &[u8]) -> u64 {
        match (read_u32_at(data, 4), Self::declared_entries(data)) {
            (Some(size), Some(n)) => size as u64 * n as u64,
            _ => 0,
        }
    }
}

impl Stsz {
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Uniform sample size, `0` if sizes vary.
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// Returns discrete list of sample sizes in bytes.
    pub fn sizes(&self) -> &[u32] {
        &self.sizes
    }
}

impl From<Stsz> for Vec<u32> {
    fn from(value: Stsz) -> Self {
        value.sizes
    }
}
