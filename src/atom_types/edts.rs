//! Edit list atom (`elst`), read via its container `edts`.
//!
//! Location: `moov/trak[multiple]/edts/elst`
//!
//! See: <https://developer.apple.com/documentation/quicktime-file-format/edit_list_atom>

use binrw::BinRead;

use super::EntryTable;

/// Edit list atom (`elst`).
///
/// Entries are only read for version 0 with no flags set,
/// anything else yields an empty table.
#[derive(Debug, Default, BinRead)]
#[br(big)]
pub struct Elst {
    pub(crate) version: u8,
    pub(crate) flags: [u8; 3],
    pub(crate) no_of_entries: u32,
    #[br(count = no_of_entries, if(version == 0 && flags == [0, 0, 0]))]
    pub(crate) entries: Vec<EditListEntry>,
}

impl EntryTable for Elst {
    const ENTRY_SIZE: u64 = 12;
}

impl Elst {
    pub fn entries(&self) -> &[EditListEntry] {
        &self.entries
    }

    /// Edit offset in movie time scale units.
    ///
    /// Segments with media time 0 are blank time
    /// and shift the track forward by their duration.
    /// A non-zero media time for the first segment
    /// is converted from track to movie time scale,
    /// then shifts the track backwards.
    ///
    /// Returns `None` if `track_time_scale` is 0.
    pub fn offset(&self, track_time_scale: u32, movie_time_scale: u32) -> Option<i64> {
        if track_time_scale == 0 {
            return None
        }
        let mut offset = 0_i64;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.media_time == 0 {
                offset += entry.segment_duration as i64;
            } else if i == 0 {
                offset -= (entry.media_time as f64 / track_time_scale as f64 * movie_time_scale as f64) as i64;
            }
        }
        Some(offset)
    }
}

#[derive(Debug, Default, Clone, Copy, BinRead)]
#[br(big)]
pub struct EditListEntry {
    /// Duration of this edit in movie time scale.
    pub segment_duration: i32,
    /// Starting time within the media in track time scale.
    /// `-1` for an empty edit.
    pub media_time: i32,
    /// Fixed-point 16.16 play rate.
    pub media_rate: i32,
}
