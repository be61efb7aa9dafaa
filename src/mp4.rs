//! Core MP4 struct and methods.
//!
//! The atom tree is walked flat: allow-listed containers
//! (`moov`, `trak`, `mdia`, `minf`, `stbl`) are descended into
//! by reading their header only, so that the next header read
//! is that of the first child. Allow-listed leaf atoms are read
//! in full and decoded, anything else is skipped using its declared size.
//!
//! ```rs
//! use mp4telemetry::{Mp4, DecoderOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), mp4telemetry::TelemetryError> {
//!     let mut mp4 = Mp4::new(Path::new("GOPRO.MP4"))?;
//!     let layout = mp4.walk(&DecoderOptions::default())?;
//!
//!     if let Some(tables) = layout.metadata.as_ref() {
//!         for location in tables.payload_locations().iter() {
//!             let payload = mp4.payload(location)?;
//!             println!("{location:?} {:?}", payload.map(|p| p.len()));
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::Path,
};

use binrw::BinRead;
use log::{debug, warn};
use time::{Duration, OffsetDateTime};

use crate::{
    atom_types::{Elst, EntryTable, HeaderTiming, Hdlr, Mdhd, Mvhd, Stco, Stsc, Stsd, Stsz, Stts, TimeToSample},
    consts::mp4_time_zero,
    reader::ByteCursor,
    track::{PayloadLocation, SampleTables},
    AtomHeader,
    DecoderOptions,
    FourCC,
    TelemetryError,
};

/// Movie level timing, from the movie header (`mvhd`)
/// and the first media header (`mdhd`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovieInfo {
    /// Movie time scale (`mvhd`).
    pub time_scale: u32,
    /// Unscaled movie duration (`mvhd`).
    pub duration: u64,
    /// Duration of the first track in the file,
    /// usually the video track.
    pub video_length: Duration,
    /// Creation time (`mvhd`).
    pub creation_time: OffsetDateTime,
    /// Modification time (`mvhd`).
    pub modification_time: OffsetDateTime,
}

impl Default for MovieInfo {
    fn default() -> Self {
        Self {
            time_scale: 0,
            duration: 0,
            video_length: Duration::ZERO,
            creation_time: mp4_time_zero(),
            modification_time: mp4_time_zero(),
        }
    }
}

impl MovieInfo {
    /// Movie duration. `Duration::ZERO` if time scale is 0.
    pub fn duration(&self) -> Duration {
        match self.time_scale {
            0 => Duration::ZERO,
            ts => Duration::saturating_seconds_f64(self.duration as f64 / ts as f64),
        }
    }
}

/// Result of walking the atom tree.
#[derive(Debug, Default, Clone)]
pub struct Layout {
    pub movie: MovieInfo,
    /// Sample tables for the first GPMF track,
    /// `None` if no such track was found.
    pub metadata: Option<SampleTables>,
    /// Number of tracks counted.
    pub tracks: usize,
}

/// Values collected for a single `trak`.
#[derive(Debug, Default)]
struct TrackContext {
    handler_type: Option<[u8; 4]>,
    /// Sample description did not match.
    disqualified: bool,
    timing: Option<HeaderTiming>,
    elst: Option<Elst>,
    stsc: Option<Stsc>,
    stsz: Option<Stsz>,
    stco: Option<Stco>,
    stts: Option<Stts>,
}

impl TrackContext {
    fn is_meta(&self, options: &DecoderOptions) -> bool {
        self.handler_type == Some(options.handler_type) && !self.disqualified
    }

    /// Compiles sample tables if this is
    /// a GPMF track with sample sizes.
    fn into_sample_tables(self, movie_time_scale: u32) -> Option<SampleTables> {
        let timing = self.timing.unwrap_or_default();
        let sample_sizes: Vec<u32> = self.stsz?.into();
        if sample_sizes.is_empty() {
            return None
        }

        let time_to_sample: Vec<TimeToSample> = self.stts.map(Vec::from).unwrap_or_default();
        let sample_count: u64 = time_to_sample.iter().map(|t| t.sample_count as u64).sum();
        if sample_count != sample_sizes.len() as u64 {
            warn!("Metadata track lists {} sample sizes, but {sample_count} sample durations.",
                sample_sizes.len());
        }

        let edit_offset = self.elst
            .and_then(|elst| elst.offset(timing.time_scale(), movie_time_scale))
            .unwrap_or(0);

        Some(SampleTables {
            time_scale: timing.time_scale(),
            duration: timing.duration_unscaled(),
            creation_time: timing.creation_time(),
            modification_time: timing.modification_time(),
            edit_offset,
            sample_sizes,
            chunk_offsets: self.stco.map(Vec::from).unwrap_or_default(),
            sample_to_chunk: self.stsc.map(Vec::from).unwrap_or_default(),
            time_to_sample,
        })
    }
}

/// Mp4 file or any other finite, seekable byte source.
pub struct Mp4<R: Read + Seek> {
    reader: ByteCursor<R>,
}

impl<R: Read + Seek> Iterator for Mp4<R> {
    type Item = AtomHeader;

    /// Non-fallible iterator over atom headers,
    /// descending into containers.
    /// Returns `None` for errors.
    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_closer_to_end(8).ok()? {
            return None
        }
        let header = self.reader.header().ok()?;
        self.reader.skip(header.next).ok()?;
        Some(header)
    }
}

impl Mp4<BufReader<File>> {
    /// New Mp4 from path.
    pub fn new(path: &Path) -> Result<Self, TelemetryError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> Mp4<R> {
    /// New Mp4 from any seekable byte source. Sets offset to 0.
    pub fn from_reader(reader: R) -> Result<Self, TelemetryError> {
        Ok(Self {
            reader: ByteCursor::new(reader)?,
        })
    }

    /// Returns source size in bytes.
    pub fn len(&self) -> u64 {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    /// Returns current position.
    pub fn pos(&mut self) -> Result<u64, TelemetryError> {
        self.reader.pos()
    }

    /// Sets position to start of source.
    pub fn reset(&mut self) -> Result<(), TelemetryError> {
        self.reader.seek_to(0)?;
        Ok(())
    }

    /// Finds the next atom with specified name,
    /// continuing from current position.
    /// Position is left at the atom's data load.
    pub fn find_atom(&mut self, name: &str) -> Result<Option<AtomHeader>, TelemetryError> {
        while !self.reader.is_closer_to_end(8)? {
            let header = self.reader.header()?;
            if header.name.to_str() == name {
                return Ok(Some(header))
            }
            if !self.reader.try_skip(header.next) {
                break
            }
        }
        Ok(None)
    }

    /// Walks the atom tree from the start of the source, collecting
    /// movie timing and the sample tables for the GPMF track.
    ///
    /// Only failing to read the atom framing itself is an error.
    /// Atoms that can not be decoded are logged and skipped,
    /// and a truncated trailing atom ends the walk.
    pub fn walk(&mut self, options: &DecoderOptions) -> Result<Layout, TelemetryError> {
        self.reset()?;

        let mut layout = Layout::default();
        let mut current: Option<TrackContext> = None;
        let mut meta_tracks: Vec<TrackContext> = Vec::new();

        while !self.reader.is_closer_to_end(8)? {
            let header = match self.reader.header() {
                Ok(hdr) => hdr,
                Err(err @ TelemetryError::UnexpectedAtomSize{..}) => {
                    warn!("{err} Stopping.");
                    break
                },
                Err(err) => return Err(err),
            };

            if header.is_container() {
                debug!("Entering '{}' @ {}, {} bytes.", header.name, header.offset, header.atom_size);
                if header.name == FourCC::Trak {
                    if let Some(track) = current.take() {
                        if track.is_meta(options) {
                            meta_tracks.push(track);
                        }
                    }
                    if layout.tracks < options.max_tracks {
                        layout.tracks += 1;
                        current = Some(TrackContext::default());
                    } else {
                        warn!("Track limit {} reached, ignoring track @ {}.", options.max_tracks, header.offset);
                    }
                }
                continue
            }

            let data_size = header.data_size();
            let remaining = self.reader.remaining()?;

            if !header.is_allowed() {
                debug!("Skipping '{}' @ {}, {} bytes.", header.name, header.offset, header.atom_size);
                if !self.reader.try_skip(data_size) {
                    debug!("'{}' @ {} extends beyond end of data. Stopping.", header.name, header.offset);
                    break
                }
                continue
            }

            if data_size > remaining {
                warn!("'{}' @ {} declares {data_size} bytes, but only {remaining} remain. Stopping.",
                    header.name, header.offset);
                break
            }

            let data = self.reader.read_bytes(usize::try_from(data_size)?)?;
            Self::decode_leaf(&header, &data, self.reader.len(), &mut layout.movie, current.as_mut(), options);
        }

        if let Some(track) = current.take() {
            if track.is_meta(options) {
                meta_tracks.push(track);
            }
        }

        let movie_time_scale = layout.movie.time_scale;
        layout.metadata = meta_tracks.into_iter()
            .find_map(|track| track.into_sample_tables(movie_time_scale));

        Ok(layout)
    }

    /// Decodes a single allow-listed leaf atom into the movie
    /// or current track. Failures are logged, never propagated.
    fn decode_leaf(
        header: &AtomHeader,
        data: &[u8],
        source_len: u64,
        movie: &mut MovieInfo,
        track: Option<&mut TrackContext>,
        options: &DecoderOptions,
    ) {
        let name = &header.name;
        let offset = header.offset;

        if *name == FourCC::Mvhd {
            match Mvhd::read(&mut Cursor::new(data)) {
                Ok(mvhd) => {
                    movie.time_scale = mvhd.time_scale();
                    movie.duration = mvhd.duration_unscaled();
                    movie.creation_time = mvhd.timing().creation_time();
                    movie.modification_time = mvhd.timing().modification_time();
                    debug!("'mvhd' @ {offset}: time scale {}, duration {}.", movie.time_scale, movie.duration);
                },
                Err(err) => warn!("Failed to decode 'mvhd' @ {offset}: {err}"),
            }
            return
        }

        // Remaining atoms only apply within a track
        let Some(track) = track else {
            debug!("'{name}' @ {offset} outside counted track, ignoring.");
            return
        };

        match name {
            FourCC::Mdhd => match Mdhd::read(&mut Cursor::new(data)) {
                Ok(mdhd) => {
                    if movie.video_length == Duration::ZERO {
                        movie.video_length = mdhd.timing().duration();
                    }
                    debug!("'mdhd' @ {offset}: time scale {}, duration {}.",
                        mdhd.time_scale(), mdhd.duration_unscaled());
                    track.timing = Some(*mdhd.timing());
                },
                Err(err) => warn!("Failed to decode 'mdhd' @ {offset}: {err}"),
            },
            FourCC::Hdlr => match Hdlr::read(&mut Cursor::new(data)) {
                // Data handler references (`dhlr`) describe
                // data location, not the track's media type.
                Ok(hdlr) if &hdlr.component_type() == b"dhlr" => {
                    debug!("'hdlr' @ {offset}: data handler '{}', ignoring.", hdlr.handler_type_str());
                },
                Ok(hdlr) => {
                    debug!("'hdlr' @ {offset}: handler type '{}'.", hdlr.handler_type_str());
                    track.handler_type = Some(hdlr.handler_type());
                },
                Err(err) => warn!("Failed to decode 'hdlr' @ {offset}: {err}"),
            },
            FourCC::Edts => {
                // Single 'elst' child: 8 byte header, then data load
                match data.get(4..8) {
                    Some(b"elst") if Elst::fits(&data[8..]) => {
                        match Elst::read(&mut Cursor::new(&data[8..])) {
                            Ok(elst) => track.elst = Some(elst),
                            Err(err) => warn!("Failed to decode 'elst' @ {offset}: {err}"),
                        }
                    },
                    Some(b"elst") => warn!("'elst' @ {offset}: entry count exceeds atom size, skipping."),
                    _ => debug!("'edts' @ {offset} has no edit list."),
                }
            },
            FourCC::Stsd if track.is_meta(options) => match Stsd::read(&mut Cursor::new(data)) {
                Ok(stsd) => {
                    debug!("'stsd' @ {offset}: data format '{}'.", stsd.data_format_str());
                    if stsd.data_format() != options.sample_format {
                        track.disqualified = true;
                    }
                },
                Err(err) => warn!("Failed to decode 'stsd' @ {offset}: {err}"),
            },
            FourCC::Stsc if track.is_meta(options) => {
                track.stsc = decode_table::<Stsc>(header, data, source_len);
            },
            FourCC::Stsz if track.is_meta(options) => {
                track.stsz = decode_table::<Stsz>(header, data, source_len);
            },
            FourCC::Stco if track.is_meta(options) => {
                track.stco = decode_table::<Stco>(header, data, source_len);
            },
            FourCC::Stts if track.is_meta(options) => {
                track.stts = decode_table::<Stts>(header, data, source_len);
            },
            _ => (),
        }
    }

    /// Reads a single payload.
    ///
    /// Returns `None` if the offset is 0, or if the payload
    /// extends beyond the end of the source.
    pub fn payload(&mut self, location: &PayloadLocation) -> Result<Option<Vec<u8>>, TelemetryError> {
        if location.offset == 0 || location.end() > self.reader.len() {
            warn!("Payload @ {}, {} bytes, outside source bounds 0..{}. Skipping.",
                location.offset, location.size, self.reader.len());
            return Ok(None)
        }
        self.reader.seek_to(location.offset)?;
        self.reader.read_bytes(location.size as usize).map(Some)
    }
}

/// Decodes an entry table atom, after verifying that
/// the declared entry count fits in the atom,
/// and that the samples it describes fit in the source.
fn decode_table<T>(header: &AtomHeader, data: &[u8], source_len: u64) -> Option<T>
where
    T: EntryTable + for<'a> BinRead<Args<'a> = ()>,
{
    if !T::fits(data) {
        warn!("'{}' @ {}: entry count {:?} exceeds atom size {}, skipping.",
            header.name, header.offset, T::declared_entries(data), header.atom_size);
        return None
    }
    let described = T::described_size(data);
    if described > source_len {
        warn!("'{}' @ {}: describes {described} bytes of samples, source is {source_len} bytes, skipping.",
            header.name, header.offset);
        return None
    }
    match T::read_be(&mut Cursor::new(data)) {
        Ok(table) => {
            debug!("'{}' @ {}: {:?} entries.", header.name, header.offset, T::declared_entries(data));
            Some(table)
        },
        Err(err) => {
            warn!("Failed to decode '{}' @ {}: {err}", header.name, header.offset);
            None
        }
    }
}
