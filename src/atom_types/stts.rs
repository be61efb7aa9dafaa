//! Time-to-sample atom (`stts`).
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stts`
//!
//! See <https://developer.apple.com/documentation/quicktime-file-format/time-to-sample_atom>

use binrw::BinRead;

use super::EntryTable;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct TimeToSample {
    pub sample_count: u32,
    /// Unscaled duration for each of the `sample_count` samples.
    pub sample_duration: u32,
}

impl TimeToSample {
    pub fn new(sample_count: u32, sample_duration: u32) -> Self {
        Self {
            sample_count,
            sample_duration
        }
    }
}

/// Time to sample atom (`stts`).
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Stts {
    _version: u8,
    _flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    #[br(count = no_of_entries)]
    pub(crate) table: Vec<TimeToSample>
}

impl EntryTable for Stts {
    const ENTRY_SIZE: u64 = 8;
}

impl Stts {
    pub fn table(&self) -> &[TimeToSample] {
        &self.table
    }

    /// Returns total number of samples.
    ///
    /// If an entry lists a duration for four samples,
    /// it counts as four entries towards the total.
    pub fn sample_sum(&self) -> u64 {
        self.table.iter()
            .map(|t| t.sample_count as u64)
            .sum()
    }

    /// Returns summed, unscaled duration.
    pub fn duration_sum(&self) -> u64 {
        self.table.iter()
            .map(|t| t.sample_duration as u64 * t.sample_count as u64)
            .sum()
    }
}

impl From<Stts> for Vec<TimeToSample> {
    fn from(value: Stts) -> Self {
        value.table
    }
}
