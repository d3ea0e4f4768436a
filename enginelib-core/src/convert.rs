//! Snapshot ↔ row mapping
//!
//! The persisted track row is redundant in places (integer and analyzed BPM,
//! key duplicated into the track-data blob, sampling fanned out to two
//! blobs) and uses sentinels the snapshot does not (rating 0, album-art id
//! 1, negative cue offsets). All of that reconciliation happens here, in
//! small read/write function pairs, so neither side leaks its encoding into
//! the other. The mapping is total for well-formed inputs and never silently
//! drops a field.

use crate::blob::{
    BeatDataBlob, BeatGridMarkerBlob, LoopBlob, LoopsBlob, OverviewWaveformBlob, QuickCueBlob,
    QuickCuesBlob, TrackDataBlob, SLOT_COUNT,
};
use crate::error::{Error, Result};
use crate::rows::{InformationRow, TrackRow};
use crate::track::{
    file_extension_of, filename_of, BeatgridMarker, HotCue, Loop, MusicalKey, SamplingInfo,
    TrackImportInfo, TrackSnapshot, ALBUM_ART_ID_NONE, TRACK_ROW_ID_NONE,
};

pub(crate) mod write {
    use super::*;

    /// None becomes 0; anything else is clamped into 0..=100
    pub fn rating(rating: Option<i32>) -> i64 {
        rating.map(|r| i64::from(r.clamp(0, 100))).unwrap_or(0)
    }

    /// Returns `(bpm, bpm_analyzed)`; the integer column is the rounded
    /// analyzed value so the two always agree.
    pub fn bpm(bpm: Option<f64>) -> (Option<i64>, Option<f64>) {
        match bpm {
            Some(value) => (Some(value.round() as i64), Some(value)),
            None => (None, None),
        }
    }

    /// Returns `(row key, track-data key)`; the blob cannot express "no
    /// key" as NULL, so it uses 0.
    pub fn key(key: Option<MusicalKey>) -> (Option<i32>, i32) {
        match key {
            Some(key) => (Some(key.id()), key.id()),
            None => (None, 0),
        }
    }

    /// Sampling fans out to the track-data and beat-data blobs alike;
    /// absence writes zeros.
    pub fn sampling(sampling: Option<SamplingInfo>) -> (f64, i64) {
        match sampling {
            Some(info) => (info.sample_rate, info.sample_count),
            None => (0.0, 0),
        }
    }

    pub fn average_loudness(average_loudness: Option<f64>) -> f64 {
        average_loudness.unwrap_or(0.0)
    }

    pub fn main_cue(main_cue: Option<f64>) -> f64 {
        main_cue.unwrap_or(0.0)
    }

    /// Freshly written markers carry zeroed unknown fields; only a decode
    /// then re-encode of an existing blob preserves non-zero ones.
    pub fn beatgrid_markers(markers: &[BeatgridMarker]) -> Vec<BeatGridMarkerBlob> {
        markers
            .iter()
            .map(|m| BeatGridMarkerBlob {
                sample_offset: m.sample_offset,
                beat_number: m.index,
                unknown1: 0,
                unknown2: 0,
            })
            .collect()
    }

    pub fn hot_cue(cue: Option<&HotCue>) -> QuickCueBlob {
        match cue {
            Some(cue) => QuickCueBlob {
                label: cue.label.clone(),
                sample_offset: cue.sample_offset,
                color: cue.color,
            },
            None => QuickCueBlob::empty(),
        }
    }

    pub fn hot_cues(cues: &[Option<HotCue>; SLOT_COUNT]) -> Vec<QuickCueBlob> {
        cues.iter().map(|c| hot_cue(c.as_ref())).collect()
    }

    pub fn loop_slot(l: Option<&Loop>) -> LoopBlob {
        match l {
            Some(l) => LoopBlob {
                label: l.label.clone(),
                start_sample_offset: l.start_sample_offset,
                end_sample_offset: l.end_sample_offset,
                is_start_set: true,
                is_end_set: true,
                color: l.color,
            },
            None => LoopBlob::empty(),
        }
    }

    pub fn loops(loops: &[Option<Loop>; SLOT_COUNT]) -> LoopsBlob {
        LoopsBlob {
            loops: loops.iter().map(|l| loop_slot(l.as_ref())).collect(),
        }
    }

    pub fn waveform(
        entries: &[crate::track::WaveformEntry],
        sampling: Option<SamplingInfo>,
    ) -> OverviewWaveformBlob {
        let samples_per_entry = sampling
            .map(|s| crate::blob::required_waveform_samples_per_entry(s.sample_rate))
            .unwrap_or(0);
        OverviewWaveformBlob {
            samples_per_entry,
            entries: entries.to_vec(),
        }
    }
}

pub(crate) mod read {
    use super::*;

    /// Row values outside 1..=100 read as absent; 0 is "unrated"
    pub fn rating(rating: i64) -> Option<i32> {
        if (1..=100).contains(&rating) {
            Some(rating as i32)
        } else {
            None
        }
    }

    /// The analyzed value wins; the integer column is a fallback
    pub fn bpm(bpm_analyzed: Option<f64>, bpm: Option<i64>) -> Option<f64> {
        bpm_analyzed.or_else(|| bpm.map(|b| b as f64))
    }

    pub fn key(key: Option<i32>) -> Option<MusicalKey> {
        key.and_then(MusicalKey::from_id)
    }

    pub fn sampling(track_data: &TrackDataBlob) -> Option<SamplingInfo> {
        if track_data.sample_rate == 0.0 {
            None
        } else {
            Some(SamplingInfo {
                sample_rate: track_data.sample_rate,
                sample_count: track_data.samples,
            })
        }
    }

    pub fn average_loudness(track_data: &TrackDataBlob) -> Option<f64> {
        if track_data.average_loudness == 0.0 {
            None
        } else {
            Some(track_data.average_loudness)
        }
    }

    pub fn beatgrid_markers(markers: &[BeatGridMarkerBlob]) -> Vec<BeatgridMarker> {
        markers
            .iter()
            .map(|m| BeatgridMarker {
                index: m.beat_number,
                sample_offset: m.sample_offset,
            })
            .collect()
    }

    pub fn hot_cue(cue: &QuickCueBlob) -> Option<HotCue> {
        if !cue.is_set() {
            return None;
        }
        Some(HotCue {
            label: cue.label.clone(),
            sample_offset: cue.sample_offset,
            color: cue.color,
        })
    }

    pub fn hot_cues(quick_cues: &QuickCuesBlob) -> [Option<HotCue>; SLOT_COUNT] {
        let mut slots: [Option<HotCue>; SLOT_COUNT] = Default::default();
        for (slot, cue) in slots.iter_mut().zip(quick_cues.quick_cues.iter()) {
            *slot = hot_cue(cue);
        }
        slots
    }

    pub fn loop_slot(l: &LoopBlob) -> Option<Loop> {
        if !l.is_set() {
            return None;
        }
        Some(Loop {
            label: l.label.clone(),
            start_sample_offset: l.start_sample_offset,
            end_sample_offset: l.end_sample_offset,
            color: l.color,
        })
    }

    pub fn loops(loops: &LoopsBlob) -> [Option<Loop>; SLOT_COUNT] {
        let mut slots: [Option<Loop>; SLOT_COUNT] = Default::default();
        for (slot, l) in slots.iter_mut().zip(loops.loops.iter()) {
            *slot = loop_slot(l);
        }
        slots
    }
}

/// Build the persisted row for a snapshot. Fails when the snapshot is not
/// ready to persist: no relative path, no file extension, or nonsensical
/// sampling.
pub(crate) fn snapshot_to_row(
    snapshot: &TrackSnapshot,
    information: &InformationRow,
) -> Result<TrackRow> {
    let relative_path = snapshot
        .relative_path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            Error::InvalidTrackSnapshot(
                "a populated relative_path is required to write a track".into(),
            )
        })?;

    let filename = filename_of(relative_path);
    if filename.is_empty() {
        return Err(Error::InvalidTrackSnapshot(format!(
            "relative_path {relative_path:?} has no filename component"
        )));
    }
    let file_type = file_extension_of(filename).ok_or_else(|| {
        Error::InvalidTrackSnapshot(format!(
            "filename {filename:?} has no file extension, so the file type cannot be determined"
        ))
    })?;

    if let Some(sampling) = snapshot.sampling {
        if sampling.sample_rate <= 0.0 || sampling.sample_count < 0 {
            return Err(Error::InvalidTrackSnapshot(format!(
                "sampling {}/{} is not valid",
                sampling.sample_rate, sampling.sample_count
            )));
        }
    }

    let (bpm, bpm_analyzed) = write::bpm(snapshot.bpm);
    let (row_key, track_data_key) = write::key(snapshot.key);
    let (sample_rate, samples) = write::sampling(snapshot.sampling);

    let track_data = TrackDataBlob {
        sample_rate,
        samples,
        average_loudness: write::average_loudness(snapshot.average_loudness),
        key: track_data_key,
    };

    let default_beat_grid = write::beatgrid_markers(&snapshot.default_beatgrid);
    let adjusted_beat_grid = write::beatgrid_markers(&snapshot.adjusted_beatgrid);
    let beat_data = BeatDataBlob {
        sample_rate,
        samples,
        is_beatgrid_set: snapshot.default_beatgrid != snapshot.adjusted_beatgrid
            || !snapshot.adjusted_beatgrid.is_empty(),
        default_beat_grid,
        adjusted_beat_grid,
    };

    let default_main_cue = write::main_cue(snapshot.default_main_cue);
    let adjusted_main_cue = write::main_cue(snapshot.adjusted_main_cue);
    let quick_cues = QuickCuesBlob {
        quick_cues: write::hot_cues(&snapshot.hot_cues),
        default_main_cue,
        is_main_cue_adjusted: default_main_cue != adjusted_main_cue,
        adjusted_main_cue,
    };

    let (origin_database_uuid, origin_track_id) = match &snapshot.import_info {
        Some(info) => (info.external_db_uuid.clone(), info.external_track_id),
        None => (
            information.uuid.clone(),
            snapshot.id.unwrap_or(TRACK_ROW_ID_NONE),
        ),
    };

    Ok(TrackRow {
        id: snapshot.id.unwrap_or(TRACK_ROW_ID_NONE),
        play_order: snapshot.track_number,
        length: snapshot.duration_ms,
        bpm,
        year: snapshot.year,
        path: relative_path.to_string(),
        filename: filename.to_string(),
        bitrate: snapshot.bitrate,
        bpm_analyzed,
        album_art_id: ALBUM_ART_ID_NONE,
        file_bytes: snapshot.file_bytes,
        title: snapshot.title.clone(),
        artist: snapshot.artist.clone(),
        album: snapshot.album.clone(),
        genre: snapshot.genre.clone(),
        comment: snapshot.comment.clone(),
        label: snapshot.publisher.clone(),
        composer: snapshot.composer.clone(),
        remixer: None,
        key: row_key,
        rating: write::rating(snapshot.rating),
        time_last_played: snapshot.last_played_at,
        is_played: false,
        file_type: file_type.to_string(),
        is_analyzed: true,
        origin_database_uuid,
        origin_track_id,
        track_data,
        overview_waveform_data: write::waveform(&snapshot.waveform, snapshot.sampling),
        beat_data,
        quick_cues,
        loops: write::loops(&snapshot.loops),
    })
}

/// Rebuild a snapshot from a persisted row
pub(crate) fn row_to_snapshot(row: &TrackRow, information: &InformationRow) -> TrackSnapshot {
    let import_info = if row.origin_database_uuid == information.uuid
        && row.origin_track_id == row.id
    {
        None
    } else {
        Some(TrackImportInfo {
            external_db_uuid: row.origin_database_uuid.clone(),
            external_track_id: row.origin_track_id,
        })
    };

    TrackSnapshot {
        id: Some(row.id),
        track_number: row.play_order,
        duration_ms: row.length,
        bpm: read::bpm(row.bpm_analyzed, row.bpm),
        year: row.year,
        bitrate: row.bitrate,
        rating: read::rating(row.rating),
        file_bytes: row.file_bytes,
        average_loudness: read::average_loudness(&row.track_data),
        title: row.title.clone(),
        artist: row.artist.clone(),
        album: row.album.clone(),
        genre: row.genre.clone(),
        comment: row.comment.clone(),
        publisher: row.label.clone(),
        composer: row.composer.clone(),
        relative_path: Some(row.path.clone()),
        key: read::key(row.key),
        sampling: read::sampling(&row.track_data),
        default_beatgrid: read::beatgrid_markers(&row.beat_data.default_beat_grid),
        adjusted_beatgrid: read::beatgrid_markers(&row.beat_data.adjusted_beat_grid),
        default_main_cue: Some(row.quick_cues.default_main_cue),
        adjusted_main_cue: Some(row.quick_cues.adjusted_main_cue),
        hot_cues: read::hot_cues(&row.quick_cues),
        loops: read::loops(&row.loops),
        waveform: row.overview_waveform_data.entries.clone(),
        last_played_at: row.time_last_played,
        import_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaVersion;
    use crate::track::PadColor;

    fn information() -> InformationRow {
        InformationRow {
            uuid: "11111111-2222-3333-4444-555555555555".into(),
            schema_version: SchemaVersion::new(2, 0, 0),
        }
    }

    fn minimal_snapshot() -> TrackSnapshot {
        TrackSnapshot {
            relative_path: Some("../01 - Some Artist - Some Song.mp3".into()),
            ..TrackSnapshot::default()
        }
    }

    #[test]
    fn test_rating_write_clamps_and_read_normalises() {
        assert_eq!(write::rating(None), 0);
        assert_eq!(write::rating(Some(-5)), 0);
        assert_eq!(write::rating(Some(150)), 100);
        assert_eq!(write::rating(Some(60)), 60);
        assert_eq!(read::rating(0), None);
        assert_eq!(read::rating(101), None);
        assert_eq!(read::rating(-2), None);
        assert_eq!(read::rating(100), Some(100));
    }

    #[test]
    fn test_bpm_fields_agree() {
        let (bpm, analyzed) = write::bpm(Some(127.53));
        assert_eq!(bpm, Some(128));
        assert_eq!(analyzed, Some(127.53));
        assert_eq!(write::bpm(None), (None, None));
        assert_eq!(read::bpm(Some(127.53), Some(128)), Some(127.53));
        assert_eq!(read::bpm(None, Some(128)), Some(128.0));
        assert_eq!(read::bpm(None, None), None);
    }

    #[test]
    fn test_key_duplicated_into_track_data() {
        let (row_key, blob_key) = write::key(Some(MusicalKey::AMinor));
        assert_eq!(row_key, Some(1));
        assert_eq!(blob_key, 1);
        assert_eq!(write::key(None), (None, 0));
        assert_eq!(read::key(Some(1)), Some(MusicalKey::AMinor));
        assert_eq!(read::key(Some(0)), None);
        assert_eq!(read::key(None), None);
    }

    #[test]
    fn test_snapshot_requires_relative_path() {
        let mut snapshot = minimal_snapshot();
        snapshot.relative_path = None;
        assert!(matches!(
            snapshot_to_row(&snapshot, &information()),
            Err(Error::InvalidTrackSnapshot(_))
        ));
        snapshot.relative_path = Some(String::new());
        assert!(snapshot_to_row(&snapshot, &information()).is_err());
    }

    #[test]
    fn test_snapshot_requires_file_extension() {
        let mut snapshot = minimal_snapshot();
        snapshot.relative_path = Some("../no_extension".into());
        assert!(matches!(
            snapshot_to_row(&snapshot, &information()),
            Err(Error::InvalidTrackSnapshot(_))
        ));
        snapshot.relative_path = Some("dir/".into());
        assert!(snapshot_to_row(&snapshot, &information()).is_err());
    }

    #[test]
    fn test_snapshot_rejects_bad_sampling() {
        let mut snapshot = minimal_snapshot();
        snapshot.sampling = Some(SamplingInfo {
            sample_rate: 0.0,
            sample_count: 100,
        });
        assert!(snapshot_to_row(&snapshot, &information()).is_err());
        snapshot.sampling = Some(SamplingInfo {
            sample_rate: 44100.0,
            sample_count: -1,
        });
        assert!(snapshot_to_row(&snapshot, &information()).is_err());
    }

    #[test]
    fn test_sampling_fans_out_to_both_blobs() {
        let mut snapshot = minimal_snapshot();
        snapshot.sampling = Some(SamplingInfo {
            sample_rate: 44100.0,
            sample_count: 16_140_600,
        });
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert_eq!(row.track_data.sample_rate, 44100.0);
        assert_eq!(row.track_data.samples, 16_140_600);
        assert_eq!(row.beat_data.sample_rate, 44100.0);
        assert_eq!(row.beat_data.samples, 16_140_600);
    }

    #[test]
    fn test_absent_sampling_writes_zeros() {
        let row = snapshot_to_row(&minimal_snapshot(), &information()).unwrap();
        assert_eq!(row.track_data.sample_rate, 0.0);
        assert_eq!(row.track_data.samples, 0);
        assert_eq!(row.beat_data.sample_rate, 0.0);
        assert_eq!(row.beat_data.samples, 0);
    }

    #[test]
    fn test_main_cue_adjusted_flag_derived() {
        let mut snapshot = minimal_snapshot();
        snapshot.default_main_cue = Some(2732.0);
        snapshot.adjusted_main_cue = Some(2732.0);
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert!(!row.quick_cues.is_main_cue_adjusted);

        snapshot.adjusted_main_cue = Some(5000.0);
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert!(row.quick_cues.is_main_cue_adjusted);
    }

    #[test]
    fn test_beatgrid_set_flag_derived() {
        let mut snapshot = minimal_snapshot();
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert!(!row.beat_data.is_beatgrid_set);

        snapshot.default_beatgrid = vec![BeatgridMarker {
            index: -4,
            sample_offset: -83316.78,
        }];
        snapshot.adjusted_beatgrid = snapshot.default_beatgrid.clone();
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert!(row.beat_data.is_beatgrid_set);
    }

    #[test]
    fn test_local_origin_defaults() {
        let info = information();
        let row = snapshot_to_row(&minimal_snapshot(), &info).unwrap();
        assert_eq!(row.origin_database_uuid, info.uuid);
        assert_eq!(row.origin_track_id, TRACK_ROW_ID_NONE);
    }

    #[test]
    fn test_import_info_overrides_origin() {
        let mut snapshot = minimal_snapshot();
        snapshot.import_info = Some(TrackImportInfo {
            external_db_uuid: "other-db".into(),
            external_track_id: 42,
        });
        let row = snapshot_to_row(&snapshot, &information()).unwrap();
        assert_eq!(row.origin_database_uuid, "other-db");
        assert_eq!(row.origin_track_id, 42);

        let mut row = row;
        row.id = 7;
        let back = row_to_snapshot(&row, &information());
        assert_eq!(back.import_info, snapshot.import_info);
    }

    #[test]
    fn test_row_snapshot_roundtrip() {
        let info = information();
        let mut snapshot = minimal_snapshot();
        snapshot.track_number = Some(1);
        snapshot.duration_ms = Some(366_000);
        snapshot.bpm = Some(120.0);
        snapshot.year = Some(1970);
        snapshot.bitrate = Some(320);
        snapshot.rating = Some(60);
        snapshot.average_loudness = Some(0.5);
        snapshot.title = Some("Some Song".into());
        snapshot.artist = Some("Some Artist".into());
        snapshot.key = Some(MusicalKey::AMinor);
        snapshot.sampling = Some(SamplingInfo {
            sample_rate: 44100.0,
            sample_count: 16_140_600,
        });
        snapshot.default_beatgrid = vec![
            BeatgridMarker {
                index: -4,
                sample_offset: -83316.78,
            },
            BeatgridMarker {
                index: 812,
                sample_offset: 17_470_734.439,
            },
        ];
        snapshot.adjusted_beatgrid = snapshot.default_beatgrid.clone();
        snapshot.default_main_cue = Some(2732.0);
        snapshot.adjusted_main_cue = Some(2732.0);
        snapshot.hot_cues[0] = Some(HotCue {
            label: "Cue 1".into(),
            sample_offset: 1_377_924.5,
            color: PadColor::new(0xFF, 0xEA, 0x8D, 0x16),
        });
        snapshot.loops[0] = Some(Loop {
            label: "Loop 1".into(),
            start_sample_offset: 1144.012,
            end_sample_offset: 345_339.134,
            color: PadColor::new(0xFF, 0xEA, 0x8D, 0x16),
        });

        let mut row = snapshot_to_row(&snapshot, &info).unwrap();
        row.id = 1;
        row.origin_track_id = 1;
        let mut back = row_to_snapshot(&row, &info);
        assert_eq!(back.id, Some(1));
        back.id = snapshot.id;
        assert_eq!(back, snapshot);
    }
}
