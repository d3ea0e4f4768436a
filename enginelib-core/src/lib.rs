//! enginelib-core: reader/writer for Engine DJ music-library databases
//!
//! This crate implements the on-disk database format used by the Engine
//! family of DJ hardware and desktop software:
//! - a schema-versioned relational store over SQLite, in two layouts
//!   (v1: `m.db` music catalog + `p.db` performance data; v2: one file)
//! - the zlib-wrapped big-endian blob formats for beat grids, quick cues,
//!   loops, overview waveforms and the track-data header
//! - the mapping between user-level track snapshots and the persisted rows
//!
//! Typical use:
//!
//! ```no_run
//! use enginelib_core::{Database, TrackSnapshot, schema};
//!
//! let (db, created) = Database::create_or_load(
//!     "Engine Library".as_ref(),
//!     schema::VERSION_LATEST,
//! )?;
//! let mut snapshot = TrackSnapshot::default();
//! snapshot.relative_path = Some("../01 - Some Artist - Some Song.mp3".into());
//! let track = db.create_track(&snapshot)?;
//! # let _ = (created, track);
//! # Ok::<(), enginelib_core::Error>(())
//! ```

pub mod blob;
pub mod codec;
mod convert;
pub mod database;
pub mod error;
pub mod rows;
pub mod schema;
pub mod storage;
pub mod track;

// Re-exports for convenience
pub use blob::{
    required_waveform_samples_per_entry, waveform_entry_count, BeatDataBlob, BeatGridMarkerBlob,
    LoopBlob, LoopsBlob, OverviewWaveformBlob, QuickCueBlob, QuickCuesBlob, TrackDataBlob,
    SLOT_COUNT,
};
pub use database::{Crate, Database, Track};
pub use error::{Error, Result};
pub use schema::{EngineVersion, SchemaFamily, SchemaVersion, ALL_VERSIONS, VERSION_LATEST,
    VERSION_LATEST_V1};
pub use storage::TransactionGuard;
pub use track::{
    standard_pad_colors, BeatgridMarker, HotCue, Loop, MusicalKey, PadColor, SamplingInfo,
    TrackImportInfo, TrackSnapshot, WaveformEntry, WaveformPoint, ALBUM_ART_ID_NONE,
    TRACK_ROW_ID_NONE,
};
