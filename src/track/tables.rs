//! Sample tables and timing for the metadata track.

use time::{Duration, OffsetDateTime};

use crate::{atom_types::{SampleToChunk, TimeToSample}, consts::mp4_time_zero};

use super::{payload_locations, PayloadLocation};

/// Sample tables and timing for the metadata track,
/// compiled while walking the atom tree.
#[derive(Debug, Clone)]
pub struct SampleTables {
    /// Track time scale (`mdhd`).
    pub time_scale: u32,
    /// Unscaled track duration (`mdhd`).
    pub duration: u64,
    /// Track creation time (`mdhd`).
    pub creation_time: OffsetDateTime,
    /// Track modification time (`mdhd`).
    pub modification_time: OffsetDateTime,
    /// Edit list offset in movie time scale units (`elst`).
    pub edit_offset: i64,
    /// Sample sizes in bytes (`stsz`).
    pub sample_sizes: Vec<u32>,
    /// Chunk offsets (`stco`).
    pub chunk_offsets: Vec<u32>,
    /// Samples per chunk (`stsc`).
    pub sample_to_chunk: Vec<SampleToChunk>,
    /// Sample durations (`stts`).
    pub time_to_sample: Vec<TimeToSample>,
}

impl Default for SampleTables {
    fn default() -> Self {
        Self {
            time_scale: 0,
            duration: 0,
            creation_time: mp4_time_zero(),
            modification_time: mp4_time_zero(),
            edit_offset: 0,
            sample_sizes: Vec::new(),
            chunk_offsets: Vec::new(),
            sample_to_chunk: Vec::new(),
            time_to_sample: Vec::new(),
        }
    }
}

impl SampleTables {
    /// Number of samples according to the time to sample table.
    pub fn sample_count(&self) -> u64 {
        self.time_to_sample.iter()
            .map(|t| t.sample_count as u64)
            .sum()
    }

    /// Number of payloads, i.e. number of sample sizes.
    pub fn len(&self) -> usize {
        self.sample_sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample_sizes.is_empty()
    }

    /// Byte offset and size for every payload.
    pub fn payload_locations(&self) -> Vec<PayloadLocation> {
        payload_locations(&self.chunk_offsets, &self.sample_to_chunk, &self.sample_sizes)
    }

    /// Total metadata stream length in seconds.
    pub fn metadata_length(&self) -> f64 {
        self.stream_timing().0
    }

    /// Base payload duration in track time scale units.
    pub fn base_duration(&self) -> f64 {
        self.stream_timing().1
    }

    /// Returns `(LENGTH_IN_SECONDS, BASE_DURATION_IN_TICKS)`.
    ///
    /// The base duration is the mean duration over all runs up to and
    /// including the last run with more than one sample (or the only run).
    /// A trailing single-sample run is typically a shorter final payload.
    fn stream_timing(&self) -> (f64, f64) {
        if self.time_scale == 0 {
            return (0.0, 0.0)
        }
        let time_scale = self.time_scale as f64;
        let runs = self.time_to_sample.len();
        let mut length = 0.0;
        let mut samples = 0_u64;
        let mut base = 0.0;
        for entry in self.time_to_sample.iter() {
            length += entry.sample_count as f64 * entry.sample_duration as f64 / time_scale;
            samples += entry.sample_count as u64;
            if (entry.sample_count > 1 || runs == 1) && samples > 0 {
                base = length * time_scale / samples as f64;
            }
        }
        (length, base)
    }

    /// Returns the time window `(IN, OUT)` in seconds
    /// for the payload with specified index,
    /// relative to the start of the video.
    ///
    /// `out` is capped at the metadata stream length,
    /// then both are shifted by the edit list offset.
    pub fn payload_window(&self, index: usize, movie_time_scale: u32) -> (f64, f64) {
        if self.time_scale == 0 {
            return (0.0, 0.0)
        }
        let (length, base) = self.stream_timing();
        let time_scale = self.time_scale as f64;

        let mut t_in = index as f64 * (base / time_scale);
        let mut t_out = (index + 1) as f64 * base / time_scale;

        if t_out > length {
            t_out = length;
        }

        if movie_time_scale > 0 {
            let shift = self.edit_offset as f64 / movie_time_scale as f64;
            t_in += shift;
            t_out += shift;
        }

        (t_in, t_out)
    }

    /// Track duration.
    pub fn duration(&self) -> Duration {
        match self.time_scale {
            0 => Duration::ZERO,
            ts => Duration::saturating_seconds_f64(self.duration as f64 / ts as f64),
        }
    }
}
