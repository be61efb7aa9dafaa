//! Sample to chunk atom (`stsc`)
//!
//! Location: `moov/trak[multiple]/mdia/minf/stbl/stsc`
//!
//! See:
//! - Sample to chunk atom: <https://developer.apple.com/documentation/quicktime-file-format/sample-to-chunk_atom>
//! - Sample to chunk table: <https://developer.apple.com/documentation/quicktime-file-format/sample-to-chunk_atom/sample-to-chunk_table>
//! - <https://github.com/essential61/mp4analyser/wiki/Understanding-The-Sample-Tables:-An-Example>

use binrw::BinRead;

use super::EntryTable;

/// Sample to chunk atom (`stsc`)
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Stsc {
    _version: u8,
    _flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    #[br(count = no_of_entries)]
    pub(crate) sample_to_chunk_table: Vec<SampleToChunk>,
}

impl EntryTable for Stsc {
    const ENTRY_SIZE: u64 = 12;
}

impl Stsc {
    pub fn table(&self) -> &[SampleToChunk] {
        &self.sample_to_chunk_table
    }
}

impl From<Stsc> for Vec<SampleToChunk> {
    fn from(value: Stsc) -> Self {
        value.sample_to_chunk_table
    }
}

/// Returns number of samples in the chunk with 1-based index `chunk_index`,
/// from a sample to chunk table.
///
/// Each entry is valid from its `first_chunk` up until the next entry's
/// `first_chunk`. The last entry is valid for all remaining chunks.
pub fn samples_per_chunk(table: &[SampleToChunk], chunk_index: usize) -> Option<u32> {
    // Return early if only one entry, since this entry
    // is true for the entire track...
    if table.len() == 1 {
        return table.first()
            .filter(|stc| chunk_index >= stc.first_chunk as usize)
            .map(|stc| stc.samples_per_chunk)
    }

    for s2chunks in table.windows(2) {
        let s2c1 = &s2chunks[0];
        let s2c2 = &s2chunks[1];

        if (s2c1.first_chunk as usize .. s2c2.first_chunk as usize).contains(&chunk_index) {
            return Some(s2c1.samples_per_chunk);
        }
    }

    // All chunks from 'first_chunk' in the last entry
    // have the same number of samples
    table.last()
        .filter(|last| chunk_index >= last.first_chunk as usize)
        .map(|last| last.samples_per_chunk)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(big)]
pub struct SampleToChunk {
    /// 1-based index of first chunk
    /// that contains the number of
    /// samples specified in `samples_per_chunk`.
    /// The following chunks will all contain the
    /// same number of samples until the next
    /// sample to chunk entry.
    pub first_chunk: u32,
    /// Number of samples for chunk number
    /// specified by `first_chunk` and on,
    /// until the next sample to chunk entry.
    pub samples_per_chunk: u32,
    pub sample_description_id: u32,
}

impl SampleToChunk {
    pub fn new(first_chunk: u32, samples_per_chunk: u32, sample_description_id: u32) -> Self {
        Self {
            first_chunk,
            samples_per_chunk,
            sample_description_id
        }
    }
}
