#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use binrw::BinRead;
    use time::{Date, Duration, Month, OffsetDateTime};

    use crate::{
        atom_types::{samples_per_chunk, EditListEntry, Elst, EntryTable, Stsc, Stsz},
        consts::NEST_LIMIT,
        telemetry::{decode_payload, parse_gpsu, yaw_from_magnetometer, Accumulator},
        track::{payload_locations, PayloadLocation, SampleTables},
        AttitudeSample,
        ByteCursor,
        DecoderOptions,
        GpmfCursor,
        GpsFix,
        Mp4,
        SampleToChunk,
        Telemetry,
        TelemetryError,
        TimeToSample,
    };

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn utc(year: i32, month: Month, day: u8, hour: u8, minute: u8, second: u8, milli: u16) -> OffsetDateTime {
        Date::from_calendar_date(year, month, day).unwrap()
            .with_hms_milli(hour, minute, second, milli).unwrap()
            .assume_utc()
    }

    // MP4 builders

    fn atom(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(((data.len() + 8) as u32).to_be_bytes());
        out.extend(name);
        out.extend(data);
        out
    }

    fn container(name: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        atom(name, &children.concat())
    }

    /// Version 0, no flags, then `fields`.
    fn full_atom(name: &[u8; 4], fields: &[u32]) -> Vec<u8> {
        let mut data = vec![0_u8; 4];
        for field in fields {
            data.extend(field.to_be_bytes());
        }
        atom(name, &data)
    }

    fn mvhd(time_scale: u32, duration: u32) -> Vec<u8> {
        full_atom(b"mvhd", &[0, 0, time_scale, duration, 0x00010000])
    }

    fn mdhd(time_scale: u32, duration: u32) -> Vec<u8> {
        // creation, modification, time scale, duration, language + quality
        full_atom(b"mdhd", &[0, 0, time_scale, duration, 0])
    }

    fn hdlr(component_type: &[u8; 4], handler_type: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0_u8; 4];
        data.extend(component_type);
        data.extend(handler_type);
        data.extend([0_u8; 13]);
        atom(b"hdlr", &data)
    }

    fn stsd(format: &[u8; 4]) -> Vec<u8> {
        let mut data = vec![0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 16];
        data.extend(format);
        data.extend([0_u8; 8]);
        atom(b"stsd", &data)
    }

    fn stts(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut fields = vec![entries.len() as u32];
        for (count, duration) in entries {
            fields.extend([*count, *duration]);
        }
        full_atom(b"stts", &fields)
    }

    fn stsc(entries: &[(u32, u32, u32)]) -> Vec<u8> {
        let mut fields = vec![entries.len() as u32];
        for (first, samples, id) in entries {
            fields.extend([*first, *samples, *id]);
        }
        full_atom(b"stsc", &fields)
    }

    fn stsz(sizes: &[u32]) -> Vec<u8> {
        let mut fields = vec![0, sizes.len() as u32];
        fields.extend(sizes);
        full_atom(b"stsz", &fields)
    }

    fn stco(offsets: &[u32]) -> Vec<u8> {
        let mut fields = vec![offsets.len() as u32];
        fields.extend(offsets);
        full_atom(b"stco", &fields)
    }

    /// `(SEGMENT_DURATION, MEDIA_TIME)`
    fn edts(entries: &[(i32, i32)]) -> Vec<u8> {
        let mut fields = vec![entries.len() as u32];
        for (duration, media_time) in entries {
            fields.extend([*duration as u32, *media_time as u32, 0x00010000]);
        }
        container(b"edts", &[full_atom(b"elst", &fields)])
    }

    fn video_trak() -> Vec<u8> {
        let stbl = container(b"stbl", &[stsd(b"avc1"), stts(&[(1, 150150)]), full_atom(b"stsz", &[1024, 1])]);
        let minf = container(b"minf", &[hdlr(b"dhlr", b"alis"), stbl]);
        let mdia = container(b"mdia", &[mdhd(30000, 150150), hdlr(b"mhlr", b"vide"), minf]);
        container(b"trak", &[mdia])
    }

    struct MetaTrack {
        handler_type: [u8; 4],
        format: [u8; 4],
        time_scale: u32,
        duration: u32,
        stts: Vec<(u32, u32)>,
        elst: Option<Vec<(i32, i32)>>,
    }

    impl Default for MetaTrack {
        fn default() -> Self {
            Self {
                handler_type: *b"meta",
                format: *b"gpmd",
                time_scale: 1000,
                duration: 5000,
                stts: vec![(1, 5000)],
                elst: None,
            }
        }
    }

    /// `moov` with a video track and a metadata track,
    /// followed by `mdat` with one payload per chunk.
    fn build_mp4(movie_time_scale: u32, track: &MetaTrack, payloads: &[Vec<u8>]) -> Vec<u8> {
        let sizes: Vec<u32> = payloads.iter().map(|p| p.len() as u32).collect();

        let moov = |first_offset: u32| {
            let mut offsets = Vec::new();
            let mut offset = first_offset;
            for size in sizes.iter() {
                offsets.push(offset);
                offset += size;
            }
            let stbl = container(b"stbl", &[
                stsd(&track.format),
                stts(&track.stts),
                stsc(&[(1, 1, 1)]),
                stsz(&sizes),
                stco(&offsets),
            ]);
            let minf = container(b"minf", &[hdlr(b"dhlr", b"alis"), stbl]);
            let mdia = container(b"mdia", &[
                mdhd(track.time_scale, track.duration),
                hdlr(b"mhlr", &track.handler_type),
                minf,
            ]);
            let mut trak = Vec::new();
            if let Some(entries) = track.elst.as_ref() {
                trak.push(edts(entries));
            }
            trak.push(mdia);
            container(b"moov", &[
                mvhd(movie_time_scale, track.duration),
                video_trak(),
                container(b"trak", &trak),
            ])
        };

        // Payloads start after moov and the mdat header
        let moov_len = moov(0).len() as u32;
        let mut mp4 = moov(moov_len + 8);
        mp4.extend(atom(b"mdat", &payloads.concat()));
        mp4
    }

    // GPMF builders

    fn klv(key: &[u8; 4], type_code: u8, struct_size: u8, repeat: u16, data: &[u8]) -> Vec<u8> {
        let mut out = key.to_vec();
        out.extend([type_code, struct_size]);
        out.extend(repeat.to_be_bytes());
        out.extend(data);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        out
    }

    fn nested(key: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
        let data = children.concat();
        klv(key, 0, 1, data.len() as u16, &data)
    }

    fn devc(children: &[Vec<u8>]) -> Vec<u8> {
        nested(b"DEVC", &[nested(b"STRM", children)])
    }

    fn scal(divisors: &[i32]) -> Vec<u8> {
        let data: Vec<u8> = divisors.iter().flat_map(|d| d.to_be_bytes()).collect();
        klv(b"SCAL", b'l', 4, divisors.len() as u16, &data)
    }

    fn gpsu(value: &str) -> Vec<u8> {
        klv(b"GPSU", b'U', 16, 1, value.as_bytes())
    }

    fn gpsp(dop: u16) -> Vec<u8> {
        klv(b"GPSP", b'S', 2, 1, &dop.to_be_bytes())
    }

    fn gps5(records: &[[i32; 5]]) -> Vec<u8> {
        let data: Vec<u8> = records.iter().flatten().flat_map(|v| v.to_be_bytes()).collect();
        klv(b"GPS5", b'l', 20, records.len() as u16, &data)
    }

    /// 7 x `i32`, then DOP and fix as `u16`.
    fn gps9(records: &[([i32; 7], u16, u16)]) -> Vec<u8> {
        let mut data = Vec::new();
        for (values, dop, fix) in records {
            data.extend(values.iter().flat_map(|v| v.to_be_bytes()));
            data.extend(dop.to_be_bytes());
            data.extend(fix.to_be_bytes());
        }
        klv(b"GPS9", b'?', 32, records.len() as u16, &data)
    }

    fn magn(records: &[[i16; 3]]) -> Vec<u8> {
        let data: Vec<u8> = records.iter().flatten().flat_map(|v| v.to_be_bytes()).collect();
        klv(b"MAGN", b's', 6, records.len() as u16, &data)
    }

    // Chunk map

    #[test]
    fn chunk_map_expands_chunks() {
        let chunk_offsets = [1000, 5000, 9000];
        let stsc = [SampleToChunk::new(1, 2, 1), SampleToChunk::new(3, 1, 1)];
        let sizes = [100, 200, 300, 400, 500];

        let locations = payload_locations(&chunk_offsets, &stsc, &sizes);

        assert_eq!(locations, vec![
            PayloadLocation::new(1000, 100),
            PayloadLocation::new(1100, 200),
            PayloadLocation::new(5000, 300),
            PayloadLocation::new(5300, 400),
            PayloadLocation::new(9000, 500),
        ]);
    }

    #[test]
    fn chunk_map_offsets_at_chunk_boundaries() {
        let chunk_offsets = [64, 4096, 8192, 20000];
        let stsc = [SampleToChunk::new(1, 3, 1), SampleToChunk::new(2, 2, 1), SampleToChunk::new(4, 4, 1)];
        let sizes = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110];

        let locations = payload_locations(&chunk_offsets, &stsc, &sizes);
        assert_eq!(locations.len(), sizes.len());

        // First sample index for each chunk: 3, 2, 2, 4 samples per chunk
        let firsts = [0, 3, 5, 7];
        for (chunk, first) in firsts.iter().enumerate() {
            assert_eq!(locations[*first].offset, chunk_offsets[chunk] as u64);
        }

        // Contiguous within chunks
        for (i, pair) in locations.windows(2).enumerate() {
            if !firsts.contains(&(i + 1)) {
                assert_eq!(pair[1].offset, pair[0].end());
                assert!(pair[1].offset >= pair[0].offset);
            }
        }
    }

    #[test]
    fn chunk_map_one_sample_per_chunk() {
        let locations = payload_locations(&[300, 100, 200], &[], &[8, 16, 24]);
        assert_eq!(locations, vec![
            PayloadLocation::new(300, 8),
            PayloadLocation::new(100, 16),
            PayloadLocation::new(200, 24),
        ]);
    }

    #[test]
    fn chunk_map_sample_sizes_are_authoritative() {
        // Chunk table could hold 6 samples, only 4 sizes
        let stsc = [SampleToChunk::new(1, 3, 1)];
        let locations = payload_locations(&[0, 1000], &stsc, &[1, 2, 3, 4]);
        assert_eq!(locations.len(), 4);
        assert_eq!(locations[3], PayloadLocation::new(1000, 4));

        // Chunk table can only hold 2 samples
        let stsc = [SampleToChunk::new(1, 1, 1)];
        let locations = payload_locations(&[0, 1000], &stsc, &[1, 2, 3, 4]);
        assert_eq!(locations.len(), 2);

        // No sample to chunk table
        assert!(payload_locations(&[0, 1000], &[], &[1, 2, 3]).is_empty());
    }

    #[test]
    fn samples_per_chunk_runs() {
        let table = [SampleToChunk::new(1, 4, 1), SampleToChunk::new(3, 2, 1), SampleToChunk::new(6, 1, 1)];
        assert_eq!(samples_per_chunk(&table, 1), Some(4));
        assert_eq!(samples_per_chunk(&table, 2), Some(4));
        assert_eq!(samples_per_chunk(&table, 3), Some(2));
        assert_eq!(samples_per_chunk(&table, 5), Some(2));
        assert_eq!(samples_per_chunk(&table, 6), Some(1));
        assert_eq!(samples_per_chunk(&table, 600), Some(1));
        assert_eq!(samples_per_chunk(&table, 0), None);
    }

    // Sample tables

    #[test]
    fn payload_window_uses_base_duration() {
        let tables = SampleTables {
            time_scale: 1000,
            time_to_sample: vec![TimeToSample::new(3, 1001), TimeToSample::new(1, 500)],
            ..SampleTables::default()
        };

        assert!((tables.metadata_length() - 3.503).abs() < 1e-9);
        assert!((tables.base_duration() - 1001.0).abs() < 1e-9);

        let (t_in, t_out) = tables.payload_window(1, 600);
        assert!((t_in - 1.001).abs() < 1e-9);
        assert!((t_out - 2.002).abs() < 1e-9);

        // Last window capped at stream length
        let (t_in, t_out) = tables.payload_window(3, 600);
        assert!((t_in - 3.003).abs() < 1e-9);
        assert!((t_out - 3.503).abs() < 1e-9);
    }

    #[test]
    fn payload_window_zero_time_scale() {
        let tables = SampleTables {
            time_to_sample: vec![TimeToSample::new(3, 1001)],
            ..SampleTables::default()
        };
        assert_eq!(tables.payload_window(2, 600), (0.0, 0.0));
    }

    #[test]
    fn edit_list_offsets() {
        let elst = Elst {
            version: 0,
            flags: [0, 0, 0],
            no_of_entries: 2,
            entries: vec![
                EditListEntry { segment_duration: 1000, media_time: 200, media_rate: 1 << 16 },
                EditListEntry { segment_duration: 300, media_time: 0, media_rate: 1 << 16 },
            ],
        };
        // -(200 / 1000 * 600) + 300
        assert_eq!(elst.offset(1000, 600), Some(180));
        assert_eq!(elst.offset(0, 600), None);
    }

    #[test]
    fn stsz_uniform_size() {
        let data: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 64, 0, 0, 0, 3];
        assert!(Stsz::fits(&data));
        let stsz = Stsz::read_be(&mut Cursor::new(&data[..])).unwrap();
        assert_eq!(stsz.sizes(), &[64, 64, 64]);
    }

    #[test]
    fn entry_count_must_fit() {
        // Declares 1000 entries, holds 1
        let data: [u8; 20] = [0, 0, 0, 0, 0, 0, 0x03, 0xe8, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1];
        assert!(!Stsc::fits(&data));
        assert_eq!(Stsc::declared_entries(&data), Some(1000));
        assert!(Stsc::fits(&[0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1]));
        assert!(!Stsc::fits(&[0, 0, 0]));
    }

    // Byte cursor

    #[test]
    fn byte_cursor_bounds() {
        let mut cursor = ByteCursor::new(Cursor::new(vec![0, 1, 2, 3, 4, 5])).unwrap();
        assert_eq!(cursor.len(), 6);
        assert_eq!(cursor.read_be::<u16>().unwrap(), 1);
        assert_eq!(cursor.peek(2).unwrap(), vec![2, 3]);
        assert_eq!(cursor.pos().unwrap(), 2);
        assert!(!cursor.try_skip(5));
        assert_eq!(cursor.pos().unwrap(), 2);
        assert!(matches!(cursor.read_bytes(5), Err(TelemetryError::ReadMismatch{got: 4, expected: 5})));
        assert!(cursor.try_skip(4));
        assert!(cursor.is_closer_to_end(1).unwrap());
        assert!(matches!(cursor.seek_to(7), Err(TelemetryError::BoundsError(7, 0, 6))));
    }

    // Atom walk

    #[test]
    fn atom_headers_64bit_size() {
        let mut large = vec![0, 0, 0, 1];
        large.extend(b"free");
        large.extend(24_u64.to_be_bytes());
        large.extend([0_u8; 8]);

        let mut bytes = large;
        bytes.extend(container(b"moov", &[mvhd(600, 1200)]));

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let free = mp4.next().unwrap();
        assert_eq!(free.name().to_str(), "free");
        assert_eq!(free.atom_size(), 24);
        assert_eq!(free.header_size(), 16);
        assert_eq!(free.data_size(), 8);

        let names: Vec<String> = mp4.map(|hdr| hdr.name().to_string()).collect();
        assert_eq!(names, vec!["moov", "mvhd"]);
    }

    #[test]
    fn walk_finds_metadata_track() {
        init_logger();
        let payload = devc(&[scal(&[1, 1, 1, 1, 1])]);
        let bytes = build_mp4(600, &MetaTrack::default(), &[payload.clone(), payload]);

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();

        assert_eq!(layout.tracks, 2);
        assert_eq!(layout.movie.time_scale, 600);
        assert!((layout.movie.video_length.as_seconds_f64() - 5.005).abs() < 1e-6);

        let tables = layout.metadata.unwrap();
        assert_eq!(tables.time_scale, 1000);
        assert_eq!(tables.duration, 5000);
        assert_eq!(tables.sample_sizes.len(), 2);
        assert_eq!(tables.chunk_offsets.len(), 2);
        assert_eq!(tables.edit_offset, 0);

        let locations = tables.payload_locations();
        assert_eq!(locations.len(), 2);
        let first = mp4.payload(&locations[0]).unwrap().unwrap();
        assert_eq!(&first[0 .. 4], b"DEVC");
    }

    #[test]
    fn walk_skips_64bit_sized_atom() {
        let mut bytes = vec![0, 0, 0, 1];
        bytes.extend(b"wide");
        bytes.extend(32_u64.to_be_bytes());
        bytes.extend([0_u8; 16]);
        bytes.extend(build_mp4(600, &MetaTrack::default(), &[devc(&[scal(&[1])])]));

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();
        assert_eq!(layout.metadata.unwrap().sample_sizes.len(), 1);
    }

    #[test]
    fn walk_stops_at_truncated_atom() {
        init_logger();
        let payload = devc(&[gpsu("230615123045.500"), scal(&[1, 1, 1, 1, 1]), gps5(&[[100, 200, 50, 0, 0]])]);
        let mut bytes = build_mp4(600, &MetaTrack::default(), &[payload]);

        // Skipped atom declaring more bytes than remain
        bytes.extend(1000_u32.to_be_bytes());
        bytes.extend(b"free");
        bytes.extend([0_u8; 10]);

        let telemetry = Telemetry::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(telemetry.locations.len(), 1);
    }

    #[test]
    fn walk_stops_at_truncated_table() {
        let mut bytes = build_mp4(600, &MetaTrack::default(), &[devc(&[scal(&[1])])]);

        // Allow-listed atom declaring more bytes than remain
        bytes.extend(500_u32.to_be_bytes());
        bytes.extend(b"stts");

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();
        assert_eq!(layout.metadata.unwrap().time_to_sample, vec![TimeToSample::new(1, 5000)]);
    }

    #[test]
    fn walk_applies_edit_list() {
        let track = MetaTrack {
            elst: Some(vec![(500, 0)]),
            ..MetaTrack::default()
        };
        let bytes = build_mp4(1000, &track, &[devc(&[scal(&[1])])]);

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();
        let tables = layout.metadata.unwrap();

        assert_eq!(tables.edit_offset, 500);
        assert_eq!(tables.payload_window(0, layout.movie.time_scale), (0.5, 5.5));
    }

    #[test]
    fn walk_requires_gpmd_sample_format() {
        let track = MetaTrack {
            format: *b"tmcd",
            ..MetaTrack::default()
        };
        let bytes = build_mp4(600, &track, &[devc(&[scal(&[1])])]);
        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        assert!(mp4.walk(&DecoderOptions::default()).unwrap().metadata.is_none());
    }

    #[test]
    fn walk_reads_64bit_header_times() {
        let creation: u64 = 3_769_677_045;
        let mut mvhd_v1 = vec![1, 0, 0, 0];
        mvhd_v1.extend(creation.to_be_bytes());
        mvhd_v1.extend((creation + 60).to_be_bytes());
        mvhd_v1.extend(1000_u32.to_be_bytes());
        mvhd_v1.extend(6_000_000_000_u64.to_be_bytes());

        let mut mdhd_v1 = vec![1, 0, 0, 0];
        mdhd_v1.extend(creation.to_be_bytes());
        mdhd_v1.extend(creation.to_be_bytes());
        mdhd_v1.extend(90000_u32.to_be_bytes());
        mdhd_v1.extend(9_000_000_000_u64.to_be_bytes());
        mdhd_v1.extend([0_u8; 4]);

        let mdia = container(b"mdia", &[atom(b"mdhd", &mdhd_v1), hdlr(b"mhlr", b"vide")]);
        let bytes = container(b"moov", &[atom(b"mvhd", &mvhd_v1), container(b"trak", &[mdia])]);

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();

        assert_eq!(layout.movie.time_scale, 1000);
        assert_eq!(layout.movie.duration, 6_000_000_000);
        assert_eq!(layout.movie.duration(), Duration::seconds(6_000_000));
        assert_eq!(layout.movie.creation_time, utc(2023, Month::June, 15, 12, 30, 45, 0));
        assert_eq!(layout.movie.modification_time, utc(2023, Month::June, 15, 12, 31, 45, 0));
        assert_eq!(layout.movie.video_length, Duration::seconds(100_000));
        assert!(layout.metadata.is_none());
    }

    #[test]
    fn walk_skips_uniform_sizes_exceeding_source() {
        init_logger();
        let stbl = container(b"stbl", &[
            stsd(b"gpmd"),
            stts(&[(1, 1000)]),
            stsc(&[(1, 1, 1)]),
            full_atom(b"stsz", &[64, u32::MAX]),
            stco(&[8]),
        ]);
        let minf = container(b"minf", &[stbl]);
        let mdia = container(b"mdia", &[mdhd(1000, 1000), hdlr(b"mhlr", b"meta"), minf]);
        let bytes = container(b"moov", &[mvhd(600, 1000), container(b"trak", &[mdia])]);

        let stsz_data: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 64, 0xff, 0xff, 0xff, 0xff];
        assert!(Stsz::fits(&stsz_data));
        assert_eq!(Stsz::described_size(&stsz_data), 64 * u32::MAX as u64);

        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();
        let layout = mp4.walk(&DecoderOptions::default()).unwrap();
        assert_eq!(layout.tracks, 1);
        assert!(layout.metadata.is_none());
    }

    #[test]
    fn missing_metadata_track() {
        let track = MetaTrack {
            handler_type: *b"soun",
            ..MetaTrack::default()
        };
        let bytes = build_mp4(600, &track, &[devc(&[scal(&[1])])]);

        let telemetry = Telemetry::from_reader(Cursor::new(bytes.clone())).unwrap();
        assert!(telemetry.locations.is_empty());
        assert_eq!(telemetry.movie.time_scale, 600);

        let options = DecoderOptions::default().with_required_metadata_track(true);
        let result = Telemetry::from_reader_with_options(Cursor::new(bytes), &options);
        assert!(matches!(result, Err(TelemetryError::NoMetadataTrack)));
    }

    #[test]
    fn payload_out_of_bounds() {
        let bytes = build_mp4(600, &MetaTrack::default(), &[devc(&[scal(&[1])])]);
        let len = bytes.len() as u64;
        let mut mp4 = Mp4::from_reader(Cursor::new(bytes)).unwrap();

        assert_eq!(mp4.payload(&PayloadLocation::new(0, 16)).unwrap(), None);
        assert_eq!(mp4.payload(&PayloadLocation::new(len - 8, 16)).unwrap(), None);
        assert!(mp4.payload(&PayloadLocation::new(len - 16, 16)).unwrap().is_some());
    }

    // GPMF cursor

    #[test]
    fn gpmf_cursor_consumes_payload() {
        let payload = nested(b"DEVC", &[
            klv(b"DVID", b'L', 4, 1, &1_u32.to_be_bytes()),
            klv(b"DVNM", b'c', 1, 11, b"HERO8 Black"),
            nested(b"STRM", &[
                scal(&[1, 1, 1, 1, 1]),
                gps5(&[[1, 2, 3, 4, 5], [6, 7, 8, 9, 10]]),
            ]),
        ]);

        let mut cursor = GpmfCursor::new(&payload);
        let keys: Vec<String> = cursor.by_ref().map(|klv| klv.key_str()).collect();

        assert_eq!(keys, vec!["DEVC", "DVID", "DVNM", "STRM", "SCAL", "GPS5"]);
        assert_eq!(cursor.position(), payload.len());
        assert_eq!(cursor.remaining(0), Some(0));
        assert_eq!(cursor.nest_level(), 0);
        assert_eq!(cursor.device_id(), Some(1));
        assert_eq!(cursor.device_name(), Some("HERO8 Black"));
        assert!(cursor.take_error().is_none());
    }

    #[test]
    fn gpmf_cursor_multiple_devices() {
        let mut payload = devc(&[scal(&[1])]);
        payload.extend(devc(&[scal(&[2]), scal(&[3])]));

        let mut cursor = GpmfCursor::new(&payload);
        let keys: Vec<String> = cursor.by_ref().map(|klv| klv.key_str()).collect();
        assert_eq!(keys, vec!["DEVC", "STRM", "SCAL", "DEVC", "STRM", "SCAL", "SCAL"]);
        assert_eq!(cursor.position(), payload.len());
    }

    #[test]
    fn gpmf_cursor_skips_corrupt_level() {
        init_logger();
        let mut corrupt = vec![0x01, 0x02, 0x03, 0x04, b'L', 4, 0, 1];
        corrupt.extend([0, 0, 0, 9]);

        let payload = nested(b"DEVC", &[
            nested(b"STRM", &[
                klv(b"AAAA", b'L', 4, 1, &7_u32.to_be_bytes()),
                corrupt,
                klv(b"LOST", b'L', 4, 1, &8_u32.to_be_bytes()),
            ]),
            nested(b"STRM", &[
                klv(b"BBBB", b'L', 4, 1, &9_u32.to_be_bytes()),
            ]),
        ]);

        let klvs: Vec<_> = GpmfCursor::new(&payload).collect();
        let keys: Vec<String> = klvs.iter().map(|klv| klv.key_str()).collect();

        assert_eq!(keys, vec!["DEVC", "STRM", "AAAA", "STRM", "BBBB"]);
        assert_eq!(klvs[4].first::<u32>().unwrap(), 9);
    }

    #[test]
    fn gpmf_cursor_skips_level_exceeding_parent() {
        // Leaf declares 64 bytes, its level only holds 4
        let mut oversized = b"HUGE".to_vec();
        oversized.extend([b'L', 4, 0, 16]);
        let inner = [klv(b"AAAA", b'L', 4, 1, &1_u32.to_be_bytes()), oversized, vec![0_u8; 4]].concat();
        let strm = klv(b"STRM", 0, 1, inner.len() as u16, &inner);

        let mut payload = nested(b"DEVC", &[strm, nested(b"STRM", &[klv(b"BBBB", b'L', 4, 1, &2_u32.to_be_bytes())])]);
        // Pad for the oversized leaf's declared data
        payload.extend([0_u8; 64]);

        let keys: Vec<String> = GpmfCursor::new(&payload).map(|klv| klv.key_str()).collect();
        assert!(!keys.contains(&String::from("HUGE")));
        assert!(keys.contains(&String::from("BBBB")));
    }

    #[test]
    fn gpmf_cursor_nest_limit() {
        let mut payload = klv(b"LEAF", b'L', 4, 1, &1_u32.to_be_bytes());
        for _ in 0 .. NEST_LIMIT + 4 {
            payload = nested(b"NEST", &[payload]);
        }

        let mut cursor = GpmfCursor::new(&payload);
        let count = cursor.by_ref().count();
        assert_eq!(count, NEST_LIMIT);
        assert!(matches!(cursor.take_error(), Some(TelemetryError::NestLimitExceeded(_))));
    }

    #[test]
    fn gpmf_cursor_find_key() {
        let payload = devc(&[gpsp(150), scal(&[1, 2]), gps5(&[[1, 2, 3, 4, 5]])]);
        let mut cursor = GpmfCursor::new(&payload);

        let scal = cursor.find_key(b"SCAL").unwrap();
        assert_eq!(scal.values::<i32>().unwrap(), vec![1, 2]);
        assert_eq!(scal.repeat, 2);
        assert!(cursor.find_key(b"GPSP").is_none());
    }

    // Telemetry

    #[test]
    fn gpsu_fixed_width() {
        assert_eq!(
            parse_gpsu("230615123045.500").unwrap(),
            utc(2023, Month::June, 15, 12, 30, 45, 500)
        );
        assert!(matches!(parse_gpsu("2306151230450500"), Err(TelemetryError::InvalidGpsu(_))));
        assert!(matches!(parse_gpsu("23061512304.500"), Err(TelemetryError::InvalidGpsu(_))));
        assert!(matches!(parse_gpsu("231315123045.500"), Err(TelemetryError::InvalidGpsu(_))));
        assert!(matches!(parse_gpsu("2306151230a5.500"), Err(TelemetryError::InvalidGpsu(_))));
    }

    #[test]
    fn magnetometer_yaw() {
        let center = (156.23, 21.3);
        assert!(yaw_from_magnetometer(256.23, 21.3, center).abs() < 1e-9);
        assert!((yaw_from_magnetometer(156.23, -78.7, center) - 90.0).abs() < 1e-9);
        assert!((yaw_from_magnetometer(56.23, 21.3, center) - 180.0).abs() < 1e-9);
        assert!((yaw_from_magnetometer(156.23, 121.3, center) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn gps9_supersedes_gps5() {
        init_logger();
        let options = DecoderOptions::default();
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();

        let before = devc(&[scal(&[1, 1, 1, 1, 1]), gps5(&[[1, 2, 3, 4, 5], [6, 7, 8, 9, 10]])]);
        decode_payload(&before, (0.0, 1.0), &mut acc, &mut telemetry, &options).unwrap();
        assert_eq!(telemetry.locations.len(), 2);

        let gps9_payload = devc(&[
            scal(&[1, 1, 1, 1, 1, 1, 1000, 100, 1]),
            gps9(&[([10, 20, 30, 4, 5, 8566, 45045000], 150, 3)]),
        ]);
        decode_payload(&gps9_payload, (1.0, 2.0), &mut acc, &mut telemetry, &options).unwrap();

        let after = devc(&[scal(&[1, 1, 1, 1, 1]), gps5(&[[11, 12, 13, 14, 15]])]);
        decode_payload(&after, (2.0, 3.0), &mut acc, &mut telemetry, &options).unwrap();

        assert!(acc.has_gps9);
        assert_eq!(telemetry.locations.len(), 1);

        let location = &telemetry.locations[0];
        assert_eq!(location.lat, 10.0);
        assert_eq!(location.lon, 20.0);
        assert_eq!(location.alt, 30.0);
        assert_eq!(location.hdop, 1);
        assert_eq!(location.fix, GpsFix::ThreeD);
        assert_eq!(location.time, Some(utc(2023, Month::June, 15, 12, 30, 45, 0)));
    }

    #[test]
    fn unreliable_dop_drops_gps5() {
        let options = DecoderOptions::default();
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();
        let anchor = utc(2023, Month::June, 15, 12, 30, 45, 500);

        let payload = devc(&[
            gpsu("230615123045.500"),
            gpsp(1200),
            scal(&[1, 1, 1, 1, 1]),
            gps5(&[[1, 2, 3, 4, 5], [6, 7, 8, 9, 10]]),
        ]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &options).unwrap();

        assert!(telemetry.locations.is_empty());
        assert_eq!(acc.utc, Some(anchor + Duration::milliseconds(500)));
        assert_eq!(telemetry.start_time, Some(anchor));
    }

    #[test]
    fn gps5_times_interpolated() {
        let options = DecoderOptions::default();
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();
        let anchor = utc(2023, Month::June, 15, 12, 30, 45, 500);

        let payload = devc(&[
            gpsu("230615123045.500"),
            gpsp(500),
            klv(b"GPSF", b'L', 4, 1, &2_u32.to_be_bytes()),
            scal(&[10, 10, 1, 1, 1]),
            gps5(&[[1, 2, 3, 4, 5], [6, 7, 8, 9, 10]]),
        ]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &options).unwrap();

        assert_eq!(telemetry.locations.len(), 2);
        assert_eq!(telemetry.locations[0].time, Some(anchor));
        assert_eq!(telemetry.locations[1].time, Some(anchor + Duration::milliseconds(500)));
        assert_eq!(telemetry.locations[1].lat, 0.6);
        assert_eq!(telemetry.locations[1].alt, 8.0);
        assert_eq!(telemetry.locations[1].hdop, 500);
        assert_eq!(telemetry.locations[1].fix, GpsFix::TwoD);
        assert_eq!(telemetry.keys, vec!["DEVC", "STRM", "GPSU", "GPSP", "GPSF", "SCAL", "GPS5"]);
    }

    #[test]
    fn gps5_without_divisors_skipped() {
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();
        let payload = devc(&[gps5(&[[1, 2, 3, 4, 5]])]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &DecoderOptions::default()).unwrap();
        assert!(telemetry.locations.is_empty());
    }

    #[test]
    fn gps5_two_byte_divisors() {
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();
        let divisors: Vec<u8> = [10_i16, 10, 1, 1, 1].iter().flat_map(|d| d.to_be_bytes()).collect();

        let payload = devc(&[
            klv(b"SCAL", b's', 2, 5, &divisors),
            gps5(&[[105, 205, 50, 3, 4]]),
        ]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &DecoderOptions::default()).unwrap();

        assert_eq!(acc.divisors, vec![10, 10, 1, 1, 1]);
        assert_eq!(telemetry.locations.len(), 1);
        assert_eq!(telemetry.locations[0].lat, 10.5);
        assert_eq!(telemetry.locations[0].lon, 20.5);
        assert_eq!(telemetry.locations[0].alt, 50.0);
        assert_eq!(telemetry.locations[0].ground_speed, 3.0);
    }

    #[test]
    fn gps9_day_out_of_range_skipped() {
        init_logger();
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();

        let payload = devc(&[
            scal(&[1, 1, 1, 1, 1, 1, 1, 1, 1]),
            gps9(&[
                ([10, 20, 30, 4, 5, 3_000_000, 0], 100, 3),
                ([11, 21, 31, 4, 5, 8566, 45045], 100, 3),
            ]),
        ]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &DecoderOptions::default()).unwrap();

        assert_eq!(telemetry.locations.len(), 1);
        assert_eq!(telemetry.locations[0].lat, 11.0);
        assert_eq!(telemetry.locations[0].time, Some(utc(2023, Month::June, 15, 12, 30, 45, 0)));
    }

    #[test]
    fn utc_clock_out_of_range_cleared() {
        let mut acc = Accumulator::default();
        let mut telemetry = Telemetry::default();

        let payload = devc(&[
            gpsu("230615123045.500"),
            gpsp(1200),
            scal(&[1, 1, 1, 1, 1]),
            gps5(&[[1, 2, 3, 4, 5]]),
        ]);
        decode_payload(&payload, (0.0, 1e12), &mut acc, &mut telemetry, &DecoderOptions::default()).unwrap();

        assert!(telemetry.locations.is_empty());
        assert!(acc.utc.is_none());

        // Next GPSU restores the clock
        let payload = devc(&[gpsu("230615123046.500"), gpsp(500), gps5(&[[1, 2, 3, 4, 5]])]);
        decode_payload(&payload, (0.0, 1.0), &mut acc, &mut telemetry, &DecoderOptions::default()).unwrap();
        assert_eq!(telemetry.locations[0].time, Some(utc(2023, Month::June, 15, 12, 30, 46, 500)));
    }

    #[test]
    fn attitude_time_out_of_range_unset() {
        let start = utc(2023, Month::June, 15, 12, 30, 45, 500);
        let mut telemetry = Telemetry {
            start_time: Some(start),
            attitudes: vec![
                AttitudeSample { offset_from_base: Duration::seconds(1), ..AttitudeSample::default() },
                AttitudeSample { offset_from_base: Duration::seconds(1_000_000_000_000), ..AttitudeSample::default() },
            ],
            ..Telemetry::default()
        };

        telemetry.finalize_attitudes();

        assert_eq!(telemetry.attitudes[0].time, Some(start + Duration::seconds(1)));
        assert_eq!(telemetry.attitudes[1].time, None);
    }

    #[test]
    fn decode_single_gps5_payload() {
        init_logger();
        let payload = nested(b"DEVC", &[
            klv(b"DVID", b'L', 4, 1, &1_u32.to_be_bytes()),
            klv(b"DVNM", b'c', 1, 11, b"HERO8 Black"),
            nested(b"STRM", &[
                gpsu("230615123045.500"),
                scal(&[1, 1, 1, 1, 1]),
                gps5(&[[100, 200, 50, 0, 0]]),
            ]),
        ]);
        let bytes = build_mp4(600, &MetaTrack::default(), &[payload]);

        let telemetry = Telemetry::from_reader(Cursor::new(bytes)).unwrap();
        let start = utc(2023, Month::June, 15, 12, 30, 45, 500);

        assert_eq!(telemetry.locations.len(), 1);
        assert_eq!(telemetry.locations[0].lat, 100.0);
        assert_eq!(telemetry.locations[0].lon, 200.0);
        assert_eq!(telemetry.locations[0].alt, 50.0);
        assert_eq!(telemetry.locations[0].time, Some(start));
        assert_eq!(telemetry.start_time, Some(start));
        assert_eq!(telemetry.device_name.as_deref(), Some("HERO8 Black"));
        assert_eq!(telemetry.device_id, Some(1));
        assert!(telemetry.file_name.is_none());
        assert_eq!(telemetry.location_span(), Some(Duration::ZERO));
    }

    #[test]
    fn decode_magnetometer_payloads() {
        init_logger();
        let track = MetaTrack {
            stts: vec![(2, 1000)],
            duration: 2000,
            ..MetaTrack::default()
        };
        let payloads = vec![
            devc(&[gpsu("230615123045.500"), magn(&[[256, 21, 0], [156, -79, 0]])]),
            devc(&[magn(&[[56, 21, 7], [156, 121, 7]])]),
        ];
        let bytes = build_mp4(600, &track, &payloads);
        let options = DecoderOptions::default().with_magnetometer_center(156.0, 21.0);

        let telemetry = Telemetry::from_reader_with_options(Cursor::new(bytes), &options).unwrap();
        let start = utc(2023, Month::June, 15, 12, 30, 45, 500);

        let yaws: Vec<f64> = telemetry.attitudes.iter().filter_map(|a| a.yaw).collect();
        assert_eq!(yaws.len(), 4);
        for (yaw, expected) in yaws.iter().zip([0.0, 90.0, 180.0, 270.0]) {
            assert!((yaw - expected).abs() < 1e-9);
        }

        let offsets: Vec<Duration> = telemetry.attitudes.iter().map(|a| a.offset_from_base).collect();
        assert_eq!(offsets, vec![
            Duration::ZERO,
            Duration::milliseconds(500),
            Duration::seconds(1),
            Duration::milliseconds(1500),
        ]);

        assert_eq!(telemetry.attitudes[3].time, Some(start + Duration::milliseconds(1500)));
        assert!(telemetry.attitudes.iter().all(|a| a.pitch.is_none() && a.roll.is_none()));
        assert_eq!(telemetry.attitude_span(), Some(Duration::milliseconds(1500)));
        assert!(telemetry.locations.is_empty());
    }
}
