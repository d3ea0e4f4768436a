//! Track snapshot value types
//!
//! A snapshot is the user-facing, identity-free view of a track: plain data
//! that callers build up and hand to the database, or get back when reading.
//! Everything the hardware persists per track lives here: metadata, beat
//! grids, cues, loops and the overview waveform.

use serde::{Deserialize, Serialize};

/// Row id sentinel for a track not yet bound to storage.
pub const TRACK_ROW_ID_NONE: i64 = 0;

/// Album-art id sentinel meaning "no art". Database creation seeds this row.
pub const ALBUM_ART_ID_NONE: i64 = 1;

/// Complete state of a single track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Row id, present iff the snapshot came from persisted storage
    pub id: Option<i64>,
    /// Track number within its album
    pub track_number: Option<i32>,
    /// Duration in milliseconds
    pub duration_ms: Option<i64>,
    /// Beats per minute, as analyzed
    pub bpm: Option<f64>,
    /// Year of release
    pub year: Option<i32>,
    /// Bitrate in kbps
    pub bitrate: Option<i64>,
    /// Rating from 0 to 100
    pub rating: Option<i32>,
    /// File size in bytes
    pub file_bytes: Option<i64>,
    /// Average loudness in the range (0, 1]
    pub average_loudness: Option<f64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub publisher: Option<String>,
    pub composer: Option<String>,
    /// Path to the audio file, relative to the database directory.
    /// Required (with a file extension) before the snapshot can be persisted.
    pub relative_path: Option<String>,
    /// Musical key
    pub key: Option<MusicalKey>,
    /// Sample rate and count
    pub sampling: Option<SamplingInfo>,
    /// Beat grid as analyzed
    pub default_beatgrid: Vec<BeatgridMarker>,
    /// Beat grid as manually adjusted
    pub adjusted_beatgrid: Vec<BeatgridMarker>,
    /// Main cue sample offset as analyzed
    pub default_main_cue: Option<f64>,
    /// Main cue sample offset as manually adjusted
    pub adjusted_main_cue: Option<f64>,
    /// Eight hot cue slots, each optionally set
    pub hot_cues: [Option<HotCue>; 8],
    /// Eight loop slots, each optionally set
    pub loops: [Option<Loop>; 8],
    /// Overview waveform, one entry per `samples_per_entry` window
    pub waveform: Vec<WaveformEntry>,
    /// Unix seconds at which the track was last played
    pub last_played_at: Option<i64>,
    /// Origin override for tracks imported from another database
    pub import_info: Option<TrackImportInfo>,
}

/// Identifies the database a track was originally imported from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackImportInfo {
    pub external_db_uuid: String,
    pub external_track_id: i64,
}

/// Sampling information for a track's audio file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingInfo {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Total number of samples in the file
    pub sample_count: i64,
}

/// Single marker in a beat grid, mapping a beat index to a sample offset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatgridMarker {
    /// Beat number at this marker; may be negative before the first audible beat
    pub index: i64,
    /// Position in samples; fractional offsets are meaningful
    pub sample_offset: f64,
}

/// Labelled, coloured bookmark at a sample offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotCue {
    pub label: String,
    pub sample_offset: f64,
    pub color: PadColor,
}

/// Labelled, coloured start/end pair for looping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub label: String,
    pub start_sample_offset: f64,
    pub end_sample_offset: f64,
    pub color: PadColor,
}

/// ARGB colour of a performance pad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadColor {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PadColor {
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }
}

/// The stock pad colours shown by Engine hardware for slots 1-8
pub mod standard_pad_colors {
    use super::PadColor;

    pub const PAD_1: PadColor = PadColor::new(0xFF, 0xEA, 0x8D, 0x16);
    pub const PAD_2: PadColor = PadColor::new(0xFF, 0xB4, 0xBE, 0x04);
    pub const PAD_3: PadColor = PadColor::new(0xFF, 0x64, 0xBE, 0x04);
    pub const PAD_4: PadColor = PadColor::new(0xFF, 0x1C, 0xBE, 0x04);
    pub const PAD_5: PadColor = PadColor::new(0xFF, 0x04, 0xBE, 0x6B);
    pub const PAD_6: PadColor = PadColor::new(0xFF, 0x04, 0xA9, 0xBE);
    pub const PAD_7: PadColor = PadColor::new(0xFF, 0x04, 0x3C, 0xBE);
    pub const PAD_8: PadColor = PadColor::new(0xFF, 0x6F, 0x04, 0xBE);

    /// Colour for a pad slot index 0-7
    pub fn for_slot(slot: usize) -> PadColor {
        [PAD_1, PAD_2, PAD_3, PAD_4, PAD_5, PAD_6, PAD_7, PAD_8][slot % 8]
    }
}

/// Per-band amplitude/opacity for one waveform time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformEntry {
    pub low: WaveformPoint,
    pub mid: WaveformPoint,
    pub high: WaveformPoint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveformPoint {
    pub value: u8,
    pub opacity: u8,
}

impl WaveformEntry {
    pub const fn new(low: WaveformPoint, mid: WaveformPoint, high: WaveformPoint) -> Self {
        Self { low, mid, high }
    }
}

/// Musical key of a track.
///
/// The integer representation is fixed by the on-disk format: 0 means "no
/// key" and 1-24 walk the Camelot wheel in relative minor/major pairs,
/// starting from A minor / C major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum MusicalKey {
    AMinor = 1,
    CMajor = 2,
    EMinor = 3,
    GMajor = 4,
    BMinor = 5,
    DMajor = 6,
    FSharpMinor = 7,
    AMajor = 8,
    CSharpMinor = 9,
    EMajor = 10,
    GSharpMinor = 11,
    BMajor = 12,
    DSharpMinor = 13,
    FSharpMajor = 14,
    ASharpMinor = 15,
    CSharpMajor = 16,
    FMinor = 17,
    AFlatMajor = 18,
    CMinor = 19,
    EFlatMajor = 20,
    GMinor = 21,
    BFlatMajor = 22,
    DMinor = 23,
    FMajor = 24,
}

impl MusicalKey {
    /// On-disk integer id (1-24)
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Key for an on-disk id; 0 and out-of-range ids mean "no key"
    pub fn from_id(id: i32) -> Option<Self> {
        use MusicalKey::*;
        const KEYS: [MusicalKey; 24] = [
            AMinor,
            CMajor,
            EMinor,
            GMajor,
            BMinor,
            DMajor,
            FSharpMinor,
            AMajor,
            CSharpMinor,
            EMajor,
            GSharpMinor,
            BMajor,
            DSharpMinor,
            FSharpMajor,
            ASharpMinor,
            CSharpMajor,
            FMinor,
            AFlatMajor,
            CMinor,
            EFlatMajor,
            GMinor,
            BFlatMajor,
            DMinor,
            FMajor,
        ];
        if (1..=24).contains(&id) {
            Some(KEYS[(id - 1) as usize])
        } else {
            None
        }
    }

    /// Display name, e.g. "Am" or "C"
    pub fn name(self) -> &'static str {
        use MusicalKey::*;
        match self {
            AMinor => "Am",
            CMajor => "C",
            EMinor => "Em",
            GMajor => "G",
            BMinor => "Bm",
            DMajor => "D",
            FSharpMinor => "F#m",
            AMajor => "A",
            CSharpMinor => "C#m",
            EMajor => "E",
            GSharpMinor => "G#m",
            BMajor => "B",
            DSharpMinor => "D#m",
            FSharpMajor => "F#",
            ASharpMinor => "A#m",
            CSharpMajor => "C#",
            FMinor => "Fm",
            AFlatMajor => "Ab",
            CMinor => "Cm",
            EFlatMajor => "Eb",
            GMinor => "Gm",
            BFlatMajor => "Bb",
            DMinor => "Dm",
            FMajor => "F",
        }
    }
}

/// Filename component of a relative path: everything after the last `/`, or
/// the whole string if there is none. Back-slash separators are not treated
/// as path separators.
pub fn filename_of(relative_path: &str) -> &str {
    match relative_path.rfind('/') {
        Some(pos) => &relative_path[pos + 1..],
        None => relative_path,
    }
}

/// File extension of a filename: everything after the last `.`, or `None`
/// when there is no dot or nothing follows it.
pub fn file_extension_of(filename: &str) -> Option<&str> {
    match filename.rfind('.') {
        Some(pos) if pos + 1 < filename.len() => Some(&filename[pos + 1..]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ids_roundtrip() {
        for id in 1..=24 {
            let key = MusicalKey::from_id(id).unwrap();
            assert_eq!(key.id(), id);
        }
        assert_eq!(MusicalKey::from_id(0), None);
        assert_eq!(MusicalKey::from_id(25), None);
        assert_eq!(MusicalKey::from_id(-3), None);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(MusicalKey::AMinor.name(), "Am");
        assert_eq!(MusicalKey::CMajor.name(), "C");
        assert_eq!(MusicalKey::FMajor.name(), "F");
    }

    #[test]
    fn test_filename_extraction() {
        assert_eq!(filename_of("../a/b/track.mp3"), "track.mp3");
        assert_eq!(filename_of("local_file.flac"), "local_file.flac");
        assert_eq!(filename_of("dir/"), "");
    }

    #[test]
    fn test_extension_extraction() {
        assert_eq!(file_extension_of("track.mp3"), Some("mp3"));
        assert_eq!(file_extension_of("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension_of("noext"), None);
        assert_eq!(file_extension_of("trailing."), None);
    }

    #[test]
    fn test_snapshot_default_has_eight_empty_slots() {
        let snapshot = TrackSnapshot::default();
        assert_eq!(snapshot.hot_cues.len(), 8);
        assert_eq!(snapshot.loops.len(), 8);
        assert!(snapshot.hot_cues.iter().all(|c| c.is_none()));
        assert!(snapshot.loops.iter().all(|l| l.is_none()));
    }
}
