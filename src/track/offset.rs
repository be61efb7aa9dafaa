//! Payload locations, i.e. absolute byte offset and size for each sample,
//! derived from chunk offsets (`stco`), samples per chunk (`stsc`),
//! and sample sizes (`stsz`).

use log::warn;

use crate::atom_types::{samples_per_chunk, SampleToChunk};

/// Absolute byte offset and size in bytes for a single sample,
/// e.g. a GPMF payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLocation {
    /// Offset in bytes from start of file.
    pub offset: u64,
    /// Sample size in bytes.
    pub size: u32,
}

impl PayloadLocation {
    pub fn new(offset: u64, size: u32) -> Self {
        Self { offset, size }
    }

    /// Absolute offset for the byte following the sample.
    pub fn end(&self) -> u64 {
        self.offset + self.size as u64
    }
}

/// Returns one location per sample.
///
/// Only chunk offsets are stored in the file. Samples within a chunk
/// are contiguous, so a sample that does not start a chunk is located
/// directly after the previous sample.
///
/// If there are as many chunk offsets as sample sizes,
/// each chunk holds a single sample and the offsets are used as is.
///
/// The sample size table is authoritative: no more locations than
/// there are sample sizes are returned, and a chunk table that
/// runs out early yields fewer locations.
pub fn payload_locations(
    chunk_offsets: &[u32],
    sample_to_chunk: &[SampleToChunk],
    sample_sizes: &[u32],
) -> Vec<PayloadLocation> {
    if chunk_offsets.is_empty() || sample_sizes.is_empty() {
        return Vec::new()
    }

    if chunk_offsets.len() == sample_sizes.len() {
        return chunk_offsets.iter()
            .zip(sample_sizes.iter())
            .map(|(offset, size)| PayloadLocation::new(*offset as u64, *size))
            .collect()
    }

    if sample_to_chunk.is_empty() {
        warn!("{} chunk offsets for {} samples, but no sample to chunk table. No payloads located.",
            chunk_offsets.len(), sample_sizes.len());
        return Vec::new()
    }

    let mut locations: Vec<PayloadLocation> = Vec::with_capacity(sample_sizes.len());
    let mut sizes = sample_sizes.iter();

    'chunks: for (i, chunk_offset) in chunk_offsets.iter().enumerate() {
        // 1-based chunk index, same as in sample to chunk table
        let no_of_samples = samples_per_chunk(sample_to_chunk, i + 1).unwrap_or(0);

        let mut offset = *chunk_offset as u64;
        for _ in 0..no_of_samples {
            let Some(size) = sizes.next() else {
                break 'chunks
            };
            locations.push(PayloadLocation::new(offset, *size));
            offset += *size as u64;
        }
    }

    if locations.len() < sample_sizes.len() {
        warn!("Chunk tables located {} of {} samples.", locations.len(), sample_sizes.len());
    }

    locations
}
