//! Database service and entity handles
//!
//! A `Database` owns (via shared reference counting) the storage for one
//! library directory. `Track` and `Crate` are cheap-to-clone handles: a
//! shared storage reference plus a row id. A handle keeps the underlying
//! connection alive but does not pin the row: deleting the row elsewhere
//! invalidates the handle observationally, detectable through `is_valid`.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::blob::SLOT_COUNT;
use crate::convert::{self, read, write};
use crate::error::{Error, Result};
use crate::rows::{
    AlbumArtRow, AlbumArtTable, CrateTable, InformationTable, PlaylistTable, SmartlistTable,
    TrackTable,
};
use crate::schema::EngineVersion;
use crate::storage::{Storage, TransactionGuard};
use crate::track::{
    BeatgridMarker, HotCue, Loop, MusicalKey, SamplingInfo, TrackImportInfo, TrackSnapshot,
    WaveformEntry, ALBUM_ART_ID_NONE,
};

fn ensure_valid_crate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::CrateInvalidName {
            name: name.to_string(),
            reason: "crate names must be non-empty",
        });
    }
    if name.contains(';') {
        return Err(Error::CrateInvalidName {
            name: name.to_string(),
            reason: "crate names must not contain semicolons",
        });
    }
    Ok(())
}

/// Handle to one Engine library directory
#[derive(Clone)]
pub struct Database {
    storage: Arc<Storage>,
}

impl Database {
    /// Create a fresh database of the given version in `dir`
    pub fn create(dir: &Path, version: EngineVersion) -> Result<Self> {
        let storage = Storage::create(dir, version)?;
        Ok(Self { storage })
    }

    /// Open an existing database directory, recognising its stored version
    pub fn load(dir: &Path) -> Result<Self> {
        let storage = Storage::open(dir)?;
        Ok(Self { storage })
    }

    /// Open `dir` if it already holds a database, otherwise create one of
    /// the given version. The boolean reports whether a create happened.
    pub fn create_or_load(dir: &Path, version: EngineVersion) -> Result<(Self, bool)> {
        if Storage::exists(dir) {
            Ok((Self::load(dir)?, false))
        } else {
            Ok((Self::create(dir, version)?, true))
        }
    }

    /// Create a database by replaying creation scripts from disk (see
    /// `ref/engine/**` for the reference set)
    pub fn create_from_script_dir(
        dir: &Path,
        version: EngineVersion,
        scripts_dir: &Path,
    ) -> Result<Self> {
        let storage = Storage::create_from_script_dir(dir, version, scripts_dir)?;
        Ok(Self { storage })
    }

    pub fn directory(&self) -> &Path {
        self.storage.directory()
    }

    pub fn version(&self) -> EngineVersion {
        self.storage.version()
    }

    pub fn version_name(&self) -> &'static str {
        self.storage.version().name
    }

    pub fn uuid(&self) -> Result<String> {
        Ok(InformationTable::new(Arc::clone(&self.storage)).get()?.uuid)
    }

    /// Assert that every table, column, index, view and trigger of this
    /// version is present with the expected signature
    pub fn verify(&self) -> Result<()> {
        self.storage.verify()
    }

    /// Apply the schema delta to the next registry version
    pub fn upgrade_to(&self, version: EngineVersion) -> Result<()> {
        self.storage.upgrade_to(version)
    }

    /// Begin the single writer transaction; see `TransactionGuard`
    pub fn begin_transaction(&self) -> Result<TransactionGuard> {
        self.storage.begin_transaction()
    }

    fn track_table(&self) -> TrackTable {
        TrackTable::new(Arc::clone(&self.storage))
    }

    fn crate_table(&self) -> CrateTable {
        CrateTable::new(Arc::clone(&self.storage))
    }

    fn information(&self) -> InformationTable {
        InformationTable::new(Arc::clone(&self.storage))
    }

    fn track_handle(&self, id: i64) -> Track {
        Track {
            storage: Arc::clone(&self.storage),
            id,
        }
    }

    fn crate_handle(&self, id: i64) -> Crate {
        Crate {
            storage: Arc::clone(&self.storage),
            id,
        }
    }

    pub fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self
            .track_table()
            .all_ids()?
            .into_iter()
            .map(|id| self.track_handle(id))
            .collect())
    }

    pub fn track_by_id(&self, id: i64) -> Result<Option<Track>> {
        Ok(self
            .track_table()
            .exists(id)?
            .then(|| self.track_handle(id)))
    }

    pub fn tracks_by_relative_path(&self, relative_path: &str) -> Result<Vec<Track>> {
        Ok(self
            .track_table()
            .ids_by_path(relative_path)?
            .into_iter()
            .map(|id| self.track_handle(id))
            .collect())
    }

    /// Persist a snapshot as a new track. The snapshot must not already be
    /// bound to a persisted track.
    pub fn create_track(&self, snapshot: &TrackSnapshot) -> Result<Track> {
        if snapshot.id.is_some() {
            return Err(Error::InvalidTrackSnapshot(
                "snapshot already pertains to a persisted track, so it cannot be created again"
                    .into(),
            ));
        }
        let information = self.information().get()?;
        let row = convert::snapshot_to_row(snapshot, &information)?;
        let id = self.track_table().add(row)?;
        info!(id, path = snapshot.relative_path.as_deref(), "created track");
        Ok(self.track_handle(id))
    }

    /// Delete a track row. References in crate lists, playlist memberships
    /// and smart-list memberships are cleared by schema cascades; the v1
    /// performance row goes in the same transaction.
    pub fn remove_track(&self, track: &Track) -> Result<()> {
        self.track_table().delete(track.id())?;
        info!(id = track.id(), "removed track");
        Ok(())
    }

    pub fn crates(&self) -> Result<Vec<Crate>> {
        Ok(self
            .crate_table()
            .all_ids()?
            .into_iter()
            .map(|id| self.crate_handle(id))
            .collect())
    }

    pub fn crate_by_id(&self, id: i64) -> Result<Option<Crate>> {
        Ok(self
            .crate_table()
            .exists(id)?
            .then(|| self.crate_handle(id)))
    }

    pub fn crates_by_name(&self, name: &str) -> Result<Vec<Crate>> {
        Ok(self
            .crate_table()
            .ids_by_title(name)?
            .into_iter()
            .map(|id| self.crate_handle(id))
            .collect())
    }

    pub fn root_crates(&self) -> Result<Vec<Crate>> {
        Ok(self
            .crate_table()
            .root_ids()?
            .into_iter()
            .map(|id| self.crate_handle(id))
            .collect())
    }

    pub fn root_crate_by_name(&self, name: &str) -> Result<Option<Crate>> {
        Ok(self
            .crate_table()
            .root_id_by_title(name)?
            .map(|id| self.crate_handle(id)))
    }

    /// Create a crate at the root of the hierarchy. A root crate's parent
    /// edge points at itself.
    pub fn create_root_crate(&self, name: &str) -> Result<Crate> {
        ensure_valid_crate_name(name)?;
        let table = self.crate_table();
        let id = self.storage.with_write_section(|| {
            let id = table.add(name, &format!("{name};"))?;
            table.add_parent(id, id)?;
            Ok(id)
        })?;
        info!(id, name, "created root crate");
        Ok(self.crate_handle(id))
    }

    /// Create a crate below an existing one
    pub fn create_crate(&self, parent: &Crate, name: &str) -> Result<Crate> {
        ensure_valid_crate_name(name)?;
        let table = self.crate_table();
        let id = self.storage.with_write_section(|| {
            let parent_row = table.get(parent.id())?.ok_or_else(|| {
                Error::CrateDatabaseInconsistency {
                    message: "parent crate does not exist".into(),
                    id: parent.id(),
                }
            })?;
            let id = table.add(name, &format!("{}{name};", parent_row.path))?;
            table.add_parent(id, parent.id())?;
            Ok(id)
        })?;
        info!(id, name, parent = parent.id(), "created crate");
        Ok(self.crate_handle(id))
    }

    /// Delete a crate row; its adjacency and membership rows cascade
    pub fn remove_crate(&self, cr: &Crate) -> Result<()> {
        self.crate_table().delete(cr.id())?;
        info!(id = cr.id(), "removed crate");
        Ok(())
    }

    /// Create an ordinary playlist (music schema 1.7.1 and later)
    pub fn create_playlist(&self, title: &str) -> Result<i64> {
        PlaylistTable::new(Arc::clone(&self.storage)).add(title)
    }

    pub fn playlists(&self) -> Result<Vec<i64>> {
        PlaylistTable::new(Arc::clone(&self.storage)).all_ids()
    }

    pub fn playlist_title(&self, playlist_id: i64) -> Result<Option<String>> {
        PlaylistTable::new(Arc::clone(&self.storage)).get_title(playlist_id)
    }

    pub fn add_track_to_playlist(&self, playlist_id: i64, track: &Track) -> Result<()> {
        PlaylistTable::new(Arc::clone(&self.storage)).add_track(playlist_id, track.id())
    }

    pub fn playlist_tracks(&self, playlist_id: i64) -> Result<Vec<Track>> {
        Ok(PlaylistTable::new(Arc::clone(&self.storage))
            .track_ids(playlist_id)?
            .into_iter()
            .map(|id| self.track_handle(id))
            .collect())
    }

    pub fn remove_playlist(&self, playlist_id: i64) -> Result<()> {
        PlaylistTable::new(Arc::clone(&self.storage)).delete(playlist_id)
    }

    /// Create a smart list (v1 layout only)
    pub fn create_smartlist(&self, title: &str, rules: &str) -> Result<i64> {
        SmartlistTable::new(Arc::clone(&self.storage)).add(title, rules)
    }

    pub fn smartlists(&self) -> Result<Vec<i64>> {
        SmartlistTable::new(Arc::clone(&self.storage)).all_ids()
    }

    pub fn remove_smartlist(&self, list_id: i64) -> Result<()> {
        SmartlistTable::new(Arc::clone(&self.storage)).delete(list_id)
    }

    pub fn add_track_to_smartlist(&self, list_id: i64, track: &Track) -> Result<()> {
        SmartlistTable::new(Arc::clone(&self.storage)).add_track(list_id, track.id())
    }

    pub fn smartlist_tracks(&self, list_id: i64) -> Result<Vec<Track>> {
        Ok(SmartlistTable::new(Arc::clone(&self.storage))
            .track_ids(list_id)?
            .into_iter()
            .map(|id| self.track_handle(id))
            .collect())
    }

    /// Store album art bytes, returning the new art id
    pub fn add_album_art(&self, hash: &str, bytes: &[u8]) -> Result<i64> {
        AlbumArtTable::new(Arc::clone(&self.storage)).add(hash, bytes)
    }

    pub fn album_art(&self, id: i64) -> Result<Option<AlbumArtRow>> {
        AlbumArtTable::new(Arc::clone(&self.storage)).get(id)
    }

    pub fn album_art_ids(&self) -> Result<Vec<i64>> {
        AlbumArtTable::new(Arc::clone(&self.storage)).all_ids()
    }

    pub fn remove_album_art(&self, id: i64) -> Result<()> {
        AlbumArtTable::new(Arc::clone(&self.storage)).delete(id)
    }
}

/// Handle to one persisted track
#[derive(Clone)]
pub struct Track {
    storage: Arc<Storage>,
    id: i64,
}

impl Track {
    fn table(&self) -> TrackTable {
        TrackTable::new(Arc::clone(&self.storage))
    }

    fn information(&self) -> InformationTable {
        InformationTable::new(Arc::clone(&self.storage))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn db(&self) -> Database {
        Database {
            storage: Arc::clone(&self.storage),
        }
    }

    /// A handle is valid while its row exists
    pub fn is_valid(&self) -> Result<bool> {
        self.table().exists(self.id)
    }

    /// Read the track's full current state
    pub fn snapshot(&self) -> Result<TrackSnapshot> {
        let information = self.information().get()?;
        let row = self
            .table()
            .get(self.id)?
            .ok_or(Error::TrackDeleted(self.id))?;
        Ok(convert::row_to_snapshot(&row, &information))
    }

    /// Replace the track's full state with the snapshot's
    pub fn update(&self, snapshot: &TrackSnapshot) -> Result<()> {
        if let Some(snapshot_id) = snapshot.id {
            if snapshot_id != self.id {
                return Err(Error::InvalidTrackSnapshot(format!(
                    "snapshot pertains to track {snapshot_id}, so it cannot update track {}",
                    self.id
                )));
            }
        }
        let information = self.information().get()?;
        let mut row = convert::snapshot_to_row(snapshot, &information)?;
        row.id = self.id;
        self.table().update(row)?;
        debug!(id = self.id, "updated track");
        Ok(())
    }

    pub fn relative_path(&self) -> Result<String> {
        self.table().get_path(self.id)
    }

    pub fn set_relative_path(&self, relative_path: &str) -> Result<()> {
        let filename = crate::track::filename_of(relative_path);
        self.table().set_path(self.id, relative_path, filename)
    }

    pub fn filename(&self) -> Result<String> {
        self.table().get_filename(self.id)
    }

    pub fn file_extension(&self) -> Result<String> {
        let filename = self.filename()?;
        Ok(crate::track::file_extension_of(&filename)
            .unwrap_or_default()
            .to_string())
    }

    pub fn title(&self) -> Result<Option<String>> {
        self.table().get_title(self.id)
    }

    pub fn set_title(&self, title: Option<String>) -> Result<()> {
        self.table().set_title(self.id, title)
    }

    pub fn artist(&self) -> Result<Option<String>> {
        self.table().get_artist(self.id)
    }

    pub fn set_artist(&self, artist: Option<String>) -> Result<()> {
        self.table().set_artist(self.id, artist)
    }

    pub fn album(&self) -> Result<Option<String>> {
        self.table().get_album(self.id)
    }

    pub fn set_album(&self, album: Option<String>) -> Result<()> {
        self.table().set_album(self.id, album)
    }

    pub fn genre(&self) -> Result<Option<String>> {
        self.table().get_genre(self.id)
    }

    pub fn set_genre(&self, genre: Option<String>) -> Result<()> {
        self.table().set_genre(self.id, genre)
    }

    pub fn comment(&self) -> Result<Option<String>> {
        self.table().get_comment(self.id)
    }

    pub fn set_comment(&self, comment: Option<String>) -> Result<()> {
        self.table().set_comment(self.id, comment)
    }

    pub fn publisher(&self) -> Result<Option<String>> {
        self.table().get_label(self.id)
    }

    pub fn set_publisher(&self, publisher: Option<String>) -> Result<()> {
        self.table().set_label(self.id, publisher)
    }

    pub fn composer(&self) -> Result<Option<String>> {
        self.table().get_composer(self.id)
    }

    pub fn set_composer(&self, composer: Option<String>) -> Result<()> {
        self.table().set_composer(self.id, composer)
    }

    pub fn year(&self) -> Result<Option<i32>> {
        self.table().get_year(self.id)
    }

    pub fn set_year(&self, year: Option<i32>) -> Result<()> {
        self.table().set_year(self.id, year)
    }

    pub fn track_number(&self) -> Result<Option<i32>> {
        self.table().get_play_order(self.id)
    }

    pub fn set_track_number(&self, track_number: Option<i32>) -> Result<()> {
        self.table().set_play_order(self.id, track_number)
    }

    pub fn duration_ms(&self) -> Result<Option<i64>> {
        self.table().get_length(self.id)
    }

    pub fn bitrate(&self) -> Result<Option<i64>> {
        self.table().get_bitrate(self.id)
    }

    pub fn set_bitrate(&self, bitrate: Option<i64>) -> Result<()> {
        self.table().set_bitrate(self.id, bitrate)
    }

    pub fn file_bytes(&self) -> Result<Option<i64>> {
        self.table().get_file_bytes(self.id)
    }

    pub fn set_file_bytes(&self, file_bytes: Option<i64>) -> Result<()> {
        self.table().set_file_bytes(self.id, file_bytes)
    }

    /// BPM, preferring the analyzed value over the integer column
    pub fn bpm(&self) -> Result<Option<f64>> {
        let table = self.table();
        Ok(read::bpm(
            table.get_bpm_analyzed(self.id)?,
            table.get_bpm(self.id)?,
        ))
    }

    /// Sets both BPM columns so they stay in agreement
    pub fn set_bpm(&self, bpm: Option<f64>) -> Result<()> {
        let (bpm, bpm_analyzed) = write::bpm(bpm);
        let table = self.table();
        self.storage.with_write_section(|| {
            table.set_bpm(self.id, bpm)?;
            table.set_bpm_analyzed(self.id, bpm_analyzed)
        })
    }

    pub fn key(&self) -> Result<Option<MusicalKey>> {
        Ok(read::key(self.table().get_key(self.id)?))
    }

    /// Sets the key column and its duplicate in the track-data blob
    pub fn set_key(&self, key: Option<MusicalKey>) -> Result<()> {
        let (row_key, track_data_key) = write::key(key);
        let table = self.table();
        self.storage.with_write_section(|| {
            table.set_key(self.id, row_key)?;
            let mut track_data = table.get_track_data(self.id)?;
            track_data.key = track_data_key;
            table.set_track_data(self.id, &track_data)
        })
    }

    pub fn rating(&self) -> Result<Option<i32>> {
        Ok(read::rating(self.table().get_rating(self.id)?))
    }

    /// Ratings outside 0..=100 are clamped
    pub fn set_rating(&self, rating: Option<i32>) -> Result<()> {
        self.table().set_rating(self.id, write::rating(rating))
    }

    pub fn sampling(&self) -> Result<Option<SamplingInfo>> {
        Ok(read::sampling(&self.table().get_track_data(self.id)?))
    }

    /// Sampling lives in both the track-data and beat-data blobs
    pub fn set_sampling(&self, sampling: Option<SamplingInfo>) -> Result<()> {
        let (sample_rate, samples) = write::sampling(sampling);
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut track_data = table.get_track_data(self.id)?;
            track_data.sample_rate = sample_rate;
            track_data.samples = samples;
            table.set_track_data(self.id, &track_data)?;

            let mut beat_data = table.get_beat_data(self.id)?;
            beat_data.sample_rate = sample_rate;
            beat_data.samples = samples;
            table.set_beat_data(self.id, &beat_data)
        })
    }

    pub fn average_loudness(&self) -> Result<Option<f64>> {
        Ok(read::average_loudness(
            &self.table().get_track_data(self.id)?,
        ))
    }

    pub fn set_average_loudness(&self, average_loudness: Option<f64>) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut track_data = table.get_track_data(self.id)?;
            track_data.average_loudness = write::average_loudness(average_loudness);
            table.set_track_data(self.id, &track_data)
        })
    }

    pub fn default_beatgrid(&self) -> Result<Vec<BeatgridMarker>> {
        Ok(read::beatgrid_markers(
            &self.table().get_beat_data(self.id)?.default_beat_grid,
        ))
    }

    pub fn set_default_beatgrid(&self, beatgrid: &[BeatgridMarker]) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut beat_data = table.get_beat_data(self.id)?;
            beat_data.default_beat_grid = write::beatgrid_markers(beatgrid);
            beat_data.is_beatgrid_set = grids_differ(&beat_data) || !beat_data.adjusted_beat_grid.is_empty();
            table.set_beat_data(self.id, &beat_data)
        })
    }

    pub fn adjusted_beatgrid(&self) -> Result<Vec<BeatgridMarker>> {
        Ok(read::beatgrid_markers(
            &self.table().get_beat_data(self.id)?.adjusted_beat_grid,
        ))
    }

    pub fn set_adjusted_beatgrid(&self, beatgrid: &[BeatgridMarker]) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut beat_data = table.get_beat_data(self.id)?;
            beat_data.adjusted_beat_grid = write::beatgrid_markers(beatgrid);
            beat_data.is_beatgrid_set = grids_differ(&beat_data) || !beat_data.adjusted_beat_grid.is_empty();
            table.set_beat_data(self.id, &beat_data)
        })
    }

    pub fn default_main_cue(&self) -> Result<f64> {
        Ok(self.table().get_quick_cues(self.id)?.default_main_cue)
    }

    pub fn set_default_main_cue(&self, sample_offset: f64) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut quick_cues = table.get_quick_cues(self.id)?;
            quick_cues.default_main_cue = sample_offset;
            quick_cues.is_main_cue_adjusted =
                quick_cues.default_main_cue != quick_cues.adjusted_main_cue;
            table.set_quick_cues(self.id, &quick_cues)
        })
    }

    pub fn adjusted_main_cue(&self) -> Result<f64> {
        Ok(self.table().get_quick_cues(self.id)?.adjusted_main_cue)
    }

    pub fn set_adjusted_main_cue(&self, sample_offset: f64) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut quick_cues = table.get_quick_cues(self.id)?;
            quick_cues.adjusted_main_cue = sample_offset;
            quick_cues.is_main_cue_adjusted =
                quick_cues.default_main_cue != quick_cues.adjusted_main_cue;
            table.set_quick_cues(self.id, &quick_cues)
        })
    }

    pub fn hot_cues(&self) -> Result<[Option<HotCue>; SLOT_COUNT]> {
        Ok(read::hot_cues(&self.table().get_quick_cues(self.id)?))
    }

    pub fn hot_cue_at(&self, index: usize) -> Result<Option<HotCue>> {
        let quick_cues = self.table().get_quick_cues(self.id)?;
        let cue = quick_cues.quick_cues.get(index).ok_or_else(|| {
            Error::InvalidTrackSnapshot(format!(
                "hot cue slot {index} exceeds the {SLOT_COUNT} slots on a track"
            ))
        })?;
        Ok(read::hot_cue(cue))
    }

    /// Read-modify-write of one slot within the quick-cues blob
    pub fn set_hot_cue_at(&self, index: usize, cue: Option<HotCue>) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut quick_cues = table.get_quick_cues(self.id)?;
            let slot = quick_cues.quick_cues.get_mut(index).ok_or_else(|| {
                Error::InvalidTrackSnapshot(format!(
                    "hot cue slot {index} exceeds the {SLOT_COUNT} slots on a track"
                ))
            })?;
            *slot = write::hot_cue(cue.as_ref());
            table.set_quick_cues(self.id, &quick_cues)
        })
    }

    pub fn set_hot_cues(&self, cues: &[Option<HotCue>; SLOT_COUNT]) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut quick_cues = table.get_quick_cues(self.id)?;
            quick_cues.quick_cues = write::hot_cues(cues);
            table.set_quick_cues(self.id, &quick_cues)
        })
    }

    pub fn loops(&self) -> Result<[Option<Loop>; SLOT_COUNT]> {
        Ok(read::loops(&self.table().get_loops(self.id)?))
    }

    pub fn loop_at(&self, index: usize) -> Result<Option<Loop>> {
        let loops = self.table().get_loops(self.id)?;
        let slot = loops.loops.get(index).ok_or_else(|| {
            Error::InvalidTrackSnapshot(format!(
                "loop slot {index} exceeds the {SLOT_COUNT} slots on a track"
            ))
        })?;
        Ok(read::loop_slot(slot))
    }

    pub fn set_loop_at(&self, index: usize, l: Option<Loop>) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let mut loops = table.get_loops(self.id)?;
            let slot = loops.loops.get_mut(index).ok_or_else(|| {
                Error::InvalidTrackSnapshot(format!(
                    "loop slot {index} exceeds the {SLOT_COUNT} slots on a track"
                ))
            })?;
            *slot = write::loop_slot(l.as_ref());
            table.set_loops(self.id, &loops)
        })
    }

    pub fn set_loops(&self, loops: &[Option<Loop>; SLOT_COUNT]) -> Result<()> {
        self.table().set_loops(self.id, &write::loops(loops))
    }

    pub fn waveform(&self) -> Result<Vec<WaveformEntry>> {
        Ok(self
            .table()
            .get_overview_waveform_data(self.id)?
            .entries)
    }

    pub fn set_waveform(&self, waveform: &[WaveformEntry]) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| {
            let sampling = read::sampling(&table.get_track_data(self.id)?);
            table.set_overview_waveform_data(self.id, &write::waveform(waveform, sampling))
        })
    }

    pub fn last_played_at(&self) -> Result<Option<i64>> {
        self.table().get_time_last_played(self.id)
    }

    pub fn set_last_played_at(&self, last_played_at: Option<i64>) -> Result<()> {
        self.table().set_time_last_played(self.id, last_played_at)
    }

    /// Album-art id, with the sentinel id mapped to absent
    pub fn album_art_id(&self) -> Result<Option<i64>> {
        let id = self.table().get_album_art_id(self.id)?;
        Ok((id != ALBUM_ART_ID_NONE).then_some(id))
    }

    /// Absent art resets to the sentinel id; a concrete id must exist
    pub fn set_album_art_id(&self, album_art_id: Option<i64>) -> Result<()> {
        let id = album_art_id.unwrap_or(ALBUM_ART_ID_NONE);
        if album_art_id.is_some()
            && !AlbumArtTable::new(Arc::clone(&self.storage)).exists(id)?
        {
            return Err(Error::TrackDatabaseInconsistency {
                message: format!("album art {id} does not exist"),
                id: self.id,
            });
        }
        self.table().set_album_art_id(self.id, id)
    }

    /// Where this track was imported from, if anywhere
    pub fn import_info(&self) -> Result<Option<TrackImportInfo>> {
        let table = self.table();
        let this_uuid = self.information().get()?.uuid;
        let origin_uuid = table.get_origin_database_uuid(self.id)?;
        let origin_track_id = table.get_origin_track_id(self.id)?;
        if origin_uuid == this_uuid && origin_track_id == self.id {
            return Ok(None);
        }
        Ok(Some(TrackImportInfo {
            external_db_uuid: origin_uuid,
            external_track_id: origin_track_id,
        }))
    }

    /// Absent import info resets the origin to "this database, this id"
    pub fn set_import_info(&self, import_info: Option<&TrackImportInfo>) -> Result<()> {
        let table = self.table();
        self.storage.with_write_section(|| match import_info {
            Some(info) => {
                table.set_origin_database_uuid(self.id, &info.external_db_uuid)?;
                table.set_origin_track_id(self.id, info.external_track_id)
            }
            None => {
                let this_uuid = self.information().get()?.uuid;
                table.set_origin_database_uuid(self.id, &this_uuid)?;
                table.set_origin_track_id(self.id, self.id)
            }
        })
    }
}

/// Compare the two grids of a beat-data blob by musical content, ignoring
/// the opaque preserved fields.
fn grids_differ(beat_data: &crate::blob::BeatDataBlob) -> bool {
    let default = beat_data
        .default_beat_grid
        .iter()
        .map(|m| (m.beat_number, m.sample_offset));
    let adjusted = beat_data
        .adjusted_beat_grid
        .iter()
        .map(|m| (m.beat_number, m.sample_offset));
    !default.eq(adjusted)
}

/// Handle to one crate
#[derive(Clone)]
pub struct Crate {
    storage: Arc<Storage>,
    id: i64,
}

impl Crate {
    fn table(&self) -> CrateTable {
        CrateTable::new(Arc::clone(&self.storage))
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn db(&self) -> Database {
        Database {
            storage: Arc::clone(&self.storage),
        }
    }

    pub fn is_valid(&self) -> Result<bool> {
        self.table().exists(self.id)
    }

    pub fn name(&self) -> Result<String> {
        self.table()
            .get(self.id)?
            .map(|row| row.title)
            .ok_or(Error::CrateDatabaseInconsistency {
                message: "crate row vanished".into(),
                id: self.id,
            })
    }

    /// Rename the crate, keeping its materialised path column in step
    pub fn set_name(&self, name: &str) -> Result<()> {
        ensure_valid_crate_name(name)?;
        let table = self.table();
        self.storage.with_write_section(|| {
            let parent_id = table.parent_id(self.id)?;
            let path = if parent_id == self.id {
                format!("{name};")
            } else {
                let parent_row =
                    table
                        .get(parent_id)?
                        .ok_or(Error::CrateDatabaseInconsistency {
                            message: "parent crate row vanished".into(),
                            id: parent_id,
                        })?;
                format!("{}{name};", parent_row.path)
            };
            table.set_title_and_path(self.id, name, &path)
        })
    }

    /// The containing crate; `None` for a root crate
    pub fn parent(&self) -> Result<Option<Crate>> {
        let parent_id = self.table().parent_id(self.id)?;
        if parent_id == self.id {
            return Ok(None);
        }
        Ok(Some(Crate {
            storage: Arc::clone(&self.storage),
            id: parent_id,
        }))
    }

    pub fn children(&self) -> Result<Vec<Crate>> {
        Ok(self
            .table()
            .child_ids(self.id)?
            .into_iter()
            .map(|id| Crate {
                storage: Arc::clone(&self.storage),
                id,
            })
            .collect())
    }

    pub fn tracks(&self) -> Result<Vec<Track>> {
        Ok(self
            .table()
            .track_ids(self.id)?
            .into_iter()
            .map(|id| Track {
                storage: Arc::clone(&self.storage),
                id,
            })
            .collect())
    }

    pub fn add_track(&self, track: &Track) -> Result<()> {
        self.table().add_track(self.id, track.id())
    }

    pub fn remove_track(&self, track: &Track) -> Result<()> {
        self.table().remove_track(self.id, track.id())
    }

    pub fn clear_tracks(&self) -> Result<()> {
        self.table().clear_tracks(self.id)
    }
}

// The track store picks its SQL per layout; re-exported here so callers can
// reason about which family a database opened as.
pub use crate::schema::SchemaFamily as DatabaseFamily;
