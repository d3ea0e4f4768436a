//! Typed row stores over the SQL engine
//!
//! One store per persisted entity, each exposing typed CRUD plus per-column
//! accessors for hot fields. Every statement is parameterised; user values
//! never reach SQL text. The track store spans the two physical layouts: in
//! v1 its scalar columns live in the music catalog's `Track` table and its
//! blob columns in `perf.PerformanceData`, in v2 everything is one `Track`
//! table.

use std::sync::Arc;

use rusqlite::{params, Connection, OptionalExtension};

use crate::blob::{BeatDataBlob, LoopsBlob, OverviewWaveformBlob, QuickCuesBlob, TrackDataBlob};
use crate::error::{Error, Result};
use crate::schema::{SchemaFamily, SchemaVersion};
use crate::storage::Storage;
use crate::track::TRACK_ROW_ID_NONE;

/// The single `Information` row of a database file
#[derive(Debug, Clone)]
pub struct InformationRow {
    pub uuid: String,
    pub schema_version: SchemaVersion,
}

pub(crate) struct InformationTable {
    storage: Arc<Storage>,
}

impl InformationTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get(&self) -> Result<InformationRow> {
        self.storage.with_conn(|conn| {
            conn.query_row(
                "SELECT uuid, schemaVersionMajor, schemaVersionMinor, schemaVersionPatch \
                 FROM Information",
                [],
                |r| {
                    Ok(InformationRow {
                        uuid: r.get(0)?,
                        schema_version: SchemaVersion::new(r.get(1)?, r.get(2)?, r.get(3)?),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::UnknownVersion("no Information row".into()))
        })
    }
}

/// Full state of one track row, including its decoded blob columns.
///
/// The same record serves both layouts; the store decides where each field
/// is persisted.
#[derive(Debug, Clone, Default)]
pub struct TrackRow {
    /// Ignored by `add`; required by `update`
    pub id: i64,
    pub play_order: Option<i32>,
    /// Duration in milliseconds
    pub length: Option<i64>,
    /// BPM rounded to an integer; kept consistent with `bpm_analyzed`
    pub bpm: Option<i64>,
    pub year: Option<i32>,
    pub path: String,
    pub filename: String,
    pub bitrate: Option<i64>,
    pub bpm_analyzed: Option<f64>,
    pub album_art_id: i64,
    pub file_bytes: Option<i64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub label: Option<String>,
    pub composer: Option<String>,
    pub remixer: Option<String>,
    /// Integer musical key, kept consistent with `track_data.key`
    pub key: Option<i32>,
    /// 0 means unrated
    pub rating: i64,
    pub time_last_played: Option<i64>,
    pub is_played: bool,
    pub file_type: String,
    pub is_analyzed: bool,
    pub origin_database_uuid: String,
    pub origin_track_id: i64,
    pub track_data: TrackDataBlob,
    pub overview_waveform_data: OverviewWaveformBlob,
    pub beat_data: BeatDataBlob,
    pub quick_cues: QuickCuesBlob,
    pub loops: LoopsBlob,
}

pub(crate) struct TrackTable {
    storage: Arc<Storage>,
}

impl TrackTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    fn family(&self) -> SchemaFamily {
        self.storage.version().family
    }

    fn origin_uuid_column(&self) -> &'static str {
        match self.family() {
            SchemaFamily::V1 => "uuidOfExternalDatabase",
            SchemaFamily::V2 => "originDatabaseUuid",
        }
    }

    fn origin_track_id_column(&self) -> &'static str {
        match self.family() {
            SchemaFamily::V1 => "idTrackInExternalDatabase",
            SchemaFamily::V2 => "originTrackId",
        }
    }

    fn album_art_column(&self) -> &'static str {
        match self.family() {
            SchemaFamily::V1 => "idAlbumArt",
            SchemaFamily::V2 => "albumArtId",
        }
    }

    fn local_uuid(&self, conn: &Connection) -> Result<String> {
        Ok(conn.query_row("SELECT uuid FROM Information", [], |r| r.get(0))?)
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.storage.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM Track WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if count > 1 {
                return Err(Error::TrackDatabaseInconsistency {
                    message: "more than one track with the same id".into(),
                    id,
                });
            }
            Ok(count == 1)
        })
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM Track ORDER BY id")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn ids_by_path(&self, relative_path: &str) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM Track WHERE path = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![relative_path], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<TrackRow>> {
        match self.family() {
            SchemaFamily::V1 => self.get_v1(id),
            SchemaFamily::V2 => self.get_v2(id),
        }
    }

    fn get_v1(&self, id: i64) -> Result<Option<TrackRow>> {
        self.storage.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT playOrder, length, bpm, year, path, filename, bitrate, \
                     bpmAnalyzed, uuidOfExternalDatabase, idTrackInExternalDatabase, \
                     idAlbumArt, fileBytes, title, artist, album, genre, comment, label, \
                     composer, remixer, key, rating, timeLastPlayed, isPlayed, fileType, \
                     isAnalyzed FROM Track WHERE id = ?1",
                    params![id],
                    |r| {
                        Ok(TrackRow {
                            id,
                            play_order: r.get(0)?,
                            length: r.get(1)?,
                            bpm: r.get(2)?,
                            year: r.get(3)?,
                            path: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
                            filename: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
                            bitrate: r.get(6)?,
                            bpm_analyzed: r.get(7)?,
                            origin_database_uuid: r
                                .get::<_, Option<String>>(8)?
                                .unwrap_or_default(),
                            origin_track_id: r.get::<_, Option<i64>>(9)?.unwrap_or(0),
                            album_art_id: r.get::<_, Option<i64>>(10)?.unwrap_or(1),
                            file_bytes: r.get(11)?,
                            title: r.get(12)?,
                            artist: r.get(13)?,
                            album: r.get(14)?,
                            genre: r.get(15)?,
                            comment: r.get(16)?,
                            label: r.get(17)?,
                            composer: r.get(18)?,
                            remixer: r.get(19)?,
                            key: r.get(20)?,
                            rating: r.get::<_, Option<i64>>(21)?.unwrap_or(0),
                            time_last_played: r.get(22)?,
                            is_played: r.get::<_, Option<bool>>(23)?.unwrap_or(false),
                            file_type: r.get::<_, Option<String>>(24)?.unwrap_or_default(),
                            is_analyzed: r.get::<_, Option<bool>>(25)?.unwrap_or(false),
                            ..TrackRow::default()
                        })
                    },
                )
                .optional()?;

            let Some(mut row) = row else {
                return Ok(None);
            };

            let blobs = conn
                .query_row(
                    "SELECT trackData, overviewWaveFormData, beatData, quickCues, loops \
                     FROM perf.PerformanceData WHERE id = ?1",
                    params![id],
                    |r| {
                        Ok((
                            r.get::<_, Option<Vec<u8>>>(0)?,
                            r.get::<_, Option<Vec<u8>>>(1)?,
                            r.get::<_, Option<Vec<u8>>>(2)?,
                            r.get::<_, Option<Vec<u8>>>(3)?,
                            r.get::<_, Option<Vec<u8>>>(4)?,
                        ))
                    },
                )
                .optional()?;
            if let Some((track_data, waveform, beat_data, quick_cues, loops)) = blobs {
                decode_blob_columns(
                    &mut row, track_data, waveform, beat_data, quick_cues, loops,
                )?;
            }
            Ok(Some(row))
        })
    }

    fn get_v2(&self, id: i64) -> Result<Option<TrackRow>> {
        self.storage.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT playOrder, length, bpm, year, path, filename, bitrate, \
                     bpmAnalyzed, originDatabaseUuid, originTrackId, albumArtId, fileBytes, \
                     title, artist, album, genre, comment, label, composer, remixer, key, \
                     rating, timeLastPlayed, isPlayed, fileType, isAnalyzed, trackData, \
                     overviewWaveFormData, beatData, quickCues, loops \
                     FROM Track WHERE id = ?1",
                    params![id],
                    |r| {
                        let row = TrackRow {
                            id,
                            play_order: r.get(0)?,
                            length: r.get(1)?,
                            bpm: r.get(2)?,
                            year: r.get(3)?,
                            path: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
                            filename: r.get::<_, Option<String>>(5)?.unwrap_or_default(),
                            bitrate: r.get(6)?,
                            bpm_analyzed: r.get(7)?,
                            origin_database_uuid: r
                                .get::<_, Option<String>>(8)?
                                .unwrap_or_default(),
                            origin_track_id: r.get::<_, Option<i64>>(9)?.unwrap_or(0),
                            album_art_id: r.get::<_, Option<i64>>(10)?.unwrap_or(1),
                            file_bytes: r.get(11)?,
                            title: r.get(12)?,
                            artist: r.get(13)?,
                            album: r.get(14)?,
                            genre: r.get(15)?,
                            comment: r.get(16)?,
                            label: r.get(17)?,
                            composer: r.get(18)?,
                            remixer: r.get(19)?,
                            key: r.get(20)?,
                            rating: r.get::<_, Option<i64>>(21)?.unwrap_or(0),
                            time_last_played: r.get(22)?,
                            is_played: r.get::<_, Option<bool>>(23)?.unwrap_or(false),
                            file_type: r.get::<_, Option<String>>(24)?.unwrap_or_default(),
                            is_analyzed: r.get::<_, Option<bool>>(25)?.unwrap_or(false),
                            ..TrackRow::default()
                        };
                        Ok((
                            row,
                            r.get::<_, Option<Vec<u8>>>(26)?,
                            r.get::<_, Option<Vec<u8>>>(27)?,
                            r.get::<_, Option<Vec<u8>>>(28)?,
                            r.get::<_, Option<Vec<u8>>>(29)?,
                            r.get::<_, Option<Vec<u8>>>(30)?,
                        ))
                    },
                )
                .optional()?;

            let Some((mut row, track_data, waveform, beat_data, quick_cues, loops)) = row
            else {
                return Ok(None);
            };
            decode_blob_columns(&mut row, track_data, waveform, beat_data, quick_cues, loops)?;
            Ok(Some(row))
        })
    }

    /// Insert a row, returning the assigned id. The input `id` is ignored.
    /// A locally originated row gets `origin_track_id` patched to its new id.
    pub fn add(&self, row: TrackRow) -> Result<i64> {
        let family = self.family();
        self.storage.with_write_section(|| {
            self.storage.with_conn(|conn| {
                let local_uuid = self.local_uuid(conn)?;
                let id = match family {
                    SchemaFamily::V1 => self.insert_v1(conn, &row, &local_uuid)?,
                    SchemaFamily::V2 => self.insert_v2(conn, &row)?,
                };
                if row.origin_database_uuid == local_uuid
                    && row.origin_track_id == TRACK_ROW_ID_NONE
                {
                    conn.execute(
                        &format!(
                            "UPDATE Track SET {} = ?1 WHERE id = ?2",
                            self.origin_track_id_column()
                        ),
                        params![id, id],
                    )?;
                }
                Ok(id)
            })
        })
    }

    fn insert_v1(&self, conn: &Connection, row: &TrackRow, local_uuid: &str) -> Result<i64> {
        let is_external = row.origin_database_uuid != local_uuid;
        conn.execute(
            "INSERT INTO Track (playOrder, length, bpm, year, path, filename, bitrate, \
             bpmAnalyzed, trackType, isExternalTrack, uuidOfExternalDatabase, \
             idTrackInExternalDatabase, idAlbumArt, fileBytes, title, artist, album, \
             genre, comment, label, composer, remixer, key, rating, timeLastPlayed, \
             isPlayed, fileType, isAnalyzed) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, \
             ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, \
             ?24, ?25, ?26, ?27)",
            params![
                row.play_order,
                row.length,
                row.bpm,
                row.year,
                row.path,
                row.filename,
                row.bitrate,
                row.bpm_analyzed,
                is_external,
                row.origin_database_uuid,
                row.origin_track_id,
                row.album_art_id,
                row.file_bytes,
                row.title,
                row.artist,
                row.album,
                row.genre,
                row.comment,
                row.label,
                row.composer,
                row.remixer,
                row.key,
                row.rating,
                row.time_last_played,
                row.is_played,
                row.file_type,
                row.is_analyzed,
            ],
        )?;
        let id = conn.last_insert_rowid();
        self.write_performance_row(conn, id, row)?;
        Ok(id)
    }

    fn write_performance_row(&self, conn: &Connection, id: i64, row: &TrackRow) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO perf.PerformanceData (id, isAnalyzed, isRendered, \
             trackData, highResolutionWaveFormData, overviewWaveFormData, beatData, \
             quickCues, loops, hasSeratoValues) VALUES (?1, ?2, 0, ?3, NULL, ?4, ?5, ?6, \
             ?7, 0)",
            params![
                id,
                row.is_analyzed,
                row.track_data.to_blob()?,
                row.overview_waveform_data.to_blob()?,
                row.beat_data.to_blob()?,
                row.quick_cues.to_blob()?,
                row.loops.to_blob()?,
            ],
        )?;
        Ok(())
    }

    fn insert_v2(&self, conn: &Connection, row: &TrackRow) -> Result<i64> {
        conn.execute(
            "INSERT INTO Track (playOrder, length, bpm, year, path, filename, bitrate, \
             bpmAnalyzed, albumArtId, fileBytes, title, artist, album, genre, comment, \
             label, composer, remixer, key, rating, albumArt, timeLastPlayed, isPlayed, \
             fileType, isAnalyzed, dateCreated, dateAdded, isAvailable, \
             isMetadataOfPackedTrackChanged, isPerformanceDataOfPackedTrackChanged, \
             playedIndicator, isMetadataImported, pdbImportKey, streamingSource, uri, \
             isBeatGridLocked, originDatabaseUuid, originTrackId, trackData, \
             overviewWaveFormData, beatData, quickCues, loops, thirdPartySourceId, \
             streamingFlags, explicitLyrics) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, \
             ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, NULL, ?21, ?22, ?23, \
             ?24, NULL, NULL, 1, 0, 0, NULL, 0, 0, NULL, NULL, 0, ?25, ?26, ?27, ?28, \
             ?29, ?30, ?31, NULL, 0, 0)",
            params![
                row.play_order,
                row.length,
                row.bpm,
                row.year,
                row.path,
                row.filename,
                row.bitrate,
                row.bpm_analyzed,
                row.album_art_id,
                row.file_bytes,
                row.title,
                row.artist,
                row.album,
                row.genre,
                row.comment,
                row.label,
                row.composer,
                row.remixer,
                row.key,
                row.rating,
                row.time_last_played,
                row.is_played,
                row.file_type,
                row.is_analyzed,
                row.origin_database_uuid,
                row.origin_track_id,
                row.track_data.to_blob()?,
                row.overview_waveform_data.to_blob()?,
                row.beat_data.to_blob()?,
                row.quick_cues.to_blob()?,
                row.loops.to_blob()?,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Full-record replacement; `row.id` must refer to an existing track
    pub fn update(&self, row: TrackRow) -> Result<()> {
        let family = self.family();
        self.storage.with_write_section(|| {
            self.storage.with_conn(|conn| {
                let local_uuid = self.local_uuid(conn)?;
                let mut row = row;
                if row.origin_database_uuid == local_uuid
                    && row.origin_track_id == TRACK_ROW_ID_NONE
                {
                    row.origin_track_id = row.id;
                }
                let changes = match family {
                    SchemaFamily::V1 => self.update_v1(conn, &row, &local_uuid)?,
                    SchemaFamily::V2 => self.update_v2(conn, &row)?,
                };
                if changes == 0 {
                    return Err(Error::TrackDeleted(row.id));
                }
                Ok(())
            })
        })
    }

    fn update_v1(&self, conn: &Connection, row: &TrackRow, local_uuid: &str) -> Result<usize> {
        let is_external = row.origin_database_uuid != local_uuid;
        let changes = conn.execute(
            "UPDATE Track SET playOrder = ?1, length = ?2, bpm = ?3, year = ?4, \
             path = ?5, filename = ?6, bitrate = ?7, bpmAnalyzed = ?8, \
             isExternalTrack = ?9, uuidOfExternalDatabase = ?10, \
             idTrackInExternalDatabase = ?11, idAlbumArt = ?12, fileBytes = ?13, \
             title = ?14, artist = ?15, album = ?16, genre = ?17, comment = ?18, \
             label = ?19, composer = ?20, remixer = ?21, key = ?22, rating = ?23, \
             timeLastPlayed = ?24, isPlayed = ?25, fileType = ?26, isAnalyzed = ?27 \
             WHERE id = ?28",
            params![
                row.play_order,
                row.length,
                row.bpm,
                row.year,
                row.path,
                row.filename,
                row.bitrate,
                row.bpm_analyzed,
                is_external,
                row.origin_database_uuid,
                row.origin_track_id,
                row.album_art_id,
                row.file_bytes,
                row.title,
                row.artist,
                row.album,
                row.genre,
                row.comment,
                row.label,
                row.composer,
                row.remixer,
                row.key,
                row.rating,
                row.time_last_played,
                row.is_played,
                row.file_type,
                row.is_analyzed,
                row.id,
            ],
        )?;
        if changes > 0 {
            self.write_performance_row(conn, row.id, row)?;
        }
        Ok(changes)
    }

    fn update_v2(&self, conn: &Connection, row: &TrackRow) -> Result<usize> {
        Ok(conn.execute(
            "UPDATE Track SET playOrder = ?1, length = ?2, bpm = ?3, year = ?4, \
             path = ?5, filename = ?6, bitrate = ?7, bpmAnalyzed = ?8, albumArtId = ?9, \
             fileBytes = ?10, title = ?11, artist = ?12, album = ?13, genre = ?14, \
             comment = ?15, label = ?16, composer = ?17, remixer = ?18, key = ?19, \
             rating = ?20, timeLastPlayed = ?21, isPlayed = ?22, fileType = ?23, \
             isAnalyzed = ?24, originDatabaseUuid = ?25, originTrackId = ?26, \
             trackData = ?27, overviewWaveFormData = ?28, beatData = ?29, \
             quickCues = ?30, loops = ?31 WHERE id = ?32",
            params![
                row.play_order,
                row.length,
                row.bpm,
                row.year,
                row.path,
                row.filename,
                row.bitrate,
                row.bpm_analyzed,
                row.album_art_id,
                row.file_bytes,
                row.title,
                row.artist,
                row.album,
                row.genre,
                row.comment,
                row.label,
                row.composer,
                row.remixer,
                row.key,
                row.rating,
                row.time_last_played,
                row.is_played,
                row.file_type,
                row.is_analyzed,
                row.origin_database_uuid,
                row.origin_track_id,
                row.track_data.to_blob()?,
                row.overview_waveform_data.to_blob()?,
                row.beat_data.to_blob()?,
                row.quick_cues.to_blob()?,
                row.loops.to_blob()?,
                row.id,
            ],
        )?)
    }

    /// Remove a row. The v1 performance row is deleted explicitly since
    /// foreign keys cannot cross attached databases; everything else is
    /// cleaned up by schema cascades.
    pub fn delete(&self, id: i64) -> Result<()> {
        let family = self.family();
        self.storage.with_write_section(|| {
            self.storage.with_conn(|conn| {
                if family == SchemaFamily::V1 {
                    conn.execute(
                        "DELETE FROM perf.PerformanceData WHERE id = ?1",
                        params![id],
                    )?;
                }
                conn.execute("DELETE FROM Track WHERE id = ?1", params![id])?;
                Ok(())
            })
        })
    }

    // Per-column accessors for hot fields. Column names are compile-time
    // constants; only values are bound.

    fn get_scalar<T: rusqlite::types::FromSql>(&self, id: i64, column: &str) -> Result<T> {
        self.storage.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {column} FROM Track WHERE id = ?1"),
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or(Error::TrackDeleted(id))
        })
    }

    fn set_scalar<T: rusqlite::ToSql>(&self, id: i64, column: &str, value: T) -> Result<()> {
        self.storage.with_conn(|conn| {
            let changes = conn.execute(
                &format!("UPDATE Track SET {column} = ?1 WHERE id = ?2"),
                params![value, id],
            )?;
            if changes == 0 {
                return Err(Error::TrackDeleted(id));
            }
            Ok(())
        })
    }

    fn get_blob_bytes(&self, id: i64, column: &str) -> Result<Option<Vec<u8>>> {
        match self.family() {
            SchemaFamily::V1 => {
                let bytes = self.storage.with_conn(|conn| {
                    Ok(conn
                        .query_row(
                            &format!(
                                "SELECT {column} FROM perf.PerformanceData WHERE id = ?1"
                            ),
                            params![id],
                            |r| r.get::<_, Option<Vec<u8>>>(0),
                        )
                        .optional()?)
                })?;
                match bytes {
                    Some(bytes) => Ok(bytes),
                    // No performance row yet: fine if the track itself exists.
                    None if self.exists(id)? => Ok(None),
                    None => Err(Error::TrackDeleted(id)),
                }
            }
            SchemaFamily::V2 => self.storage.with_conn(|conn| {
                conn.query_row(
                    &format!("SELECT {column} FROM Track WHERE id = ?1"),
                    params![id],
                    |r| r.get::<_, Option<Vec<u8>>>(0),
                )
                .optional()?
                .ok_or(Error::TrackDeleted(id))
            }),
        }
    }

    fn set_blob_bytes(&self, id: i64, column: &str, bytes: Vec<u8>) -> Result<()> {
        match self.family() {
            SchemaFamily::V1 => self.storage.with_write_section(|| {
                if !self.exists(id)? {
                    return Err(Error::TrackDeleted(id));
                }
                self.storage.with_conn(|conn| {
                    conn.execute(
                        "INSERT OR IGNORE INTO perf.PerformanceData (id, isAnalyzed, \
                         isRendered, hasSeratoValues) VALUES (?1, 1, 0, 0)",
                        params![id],
                    )?;
                    conn.execute(
                        &format!("UPDATE perf.PerformanceData SET {column} = ?1 WHERE id = ?2"),
                        params![bytes, id],
                    )?;
                    Ok(())
                })
            }),
            SchemaFamily::V2 => self.set_scalar(id, column, bytes),
        }
    }

    pub fn get_title(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "title")
    }

    pub fn set_title(&self, id: i64, title: Option<String>) -> Result<()> {
        self.set_scalar(id, "title", title)
    }

    pub fn get_artist(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "artist")
    }

    pub fn set_artist(&self, id: i64, artist: Option<String>) -> Result<()> {
        self.set_scalar(id, "artist", artist)
    }

    pub fn get_album(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "album")
    }

    pub fn set_album(&self, id: i64, album: Option<String>) -> Result<()> {
        self.set_scalar(id, "album", album)
    }

    pub fn get_genre(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "genre")
    }

    pub fn set_genre(&self, id: i64, genre: Option<String>) -> Result<()> {
        self.set_scalar(id, "genre", genre)
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "comment")
    }

    pub fn set_comment(&self, id: i64, comment: Option<String>) -> Result<()> {
        self.set_scalar(id, "comment", comment)
    }

    pub fn get_label(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "label")
    }

    pub fn set_label(&self, id: i64, label: Option<String>) -> Result<()> {
        self.set_scalar(id, "label", label)
    }

    pub fn get_composer(&self, id: i64) -> Result<Option<String>> {
        self.get_scalar(id, "composer")
    }

    pub fn set_composer(&self, id: i64, composer: Option<String>) -> Result<()> {
        self.set_scalar(id, "composer", composer)
    }

    pub fn get_year(&self, id: i64) -> Result<Option<i32>> {
        self.get_scalar(id, "year")
    }

    pub fn set_year(&self, id: i64, year: Option<i32>) -> Result<()> {
        self.set_scalar(id, "year", year)
    }

    pub fn get_play_order(&self, id: i64) -> Result<Option<i32>> {
        self.get_scalar(id, "playOrder")
    }

    pub fn set_play_order(&self, id: i64, play_order: Option<i32>) -> Result<()> {
        self.set_scalar(id, "playOrder", play_order)
    }

    pub fn get_length(&self, id: i64) -> Result<Option<i64>> {
        self.get_scalar(id, "length")
    }

    pub fn get_bitrate(&self, id: i64) -> Result<Option<i64>> {
        self.get_scalar(id, "bitrate")
    }

    pub fn set_bitrate(&self, id: i64, bitrate: Option<i64>) -> Result<()> {
        self.set_scalar(id, "bitrate", bitrate)
    }

    pub fn get_file_bytes(&self, id: i64) -> Result<Option<i64>> {
        self.get_scalar(id, "fileBytes")
    }

    pub fn set_file_bytes(&self, id: i64, file_bytes: Option<i64>) -> Result<()> {
        self.set_scalar(id, "fileBytes", file_bytes)
    }

    pub fn get_bpm(&self, id: i64) -> Result<Option<i64>> {
        self.get_scalar(id, "bpm")
    }

    pub fn set_bpm(&self, id: i64, bpm: Option<i64>) -> Result<()> {
        self.set_scalar(id, "bpm", bpm)
    }

    pub fn get_bpm_analyzed(&self, id: i64) -> Result<Option<f64>> {
        self.get_scalar(id, "bpmAnalyzed")
    }

    pub fn set_bpm_analyzed(&self, id: i64, bpm_analyzed: Option<f64>) -> Result<()> {
        self.set_scalar(id, "bpmAnalyzed", bpm_analyzed)
    }

    pub fn get_key(&self, id: i64) -> Result<Option<i32>> {
        self.get_scalar(id, "key")
    }

    pub fn set_key(&self, id: i64, key: Option<i32>) -> Result<()> {
        self.set_scalar(id, "key", key)
    }

    pub fn get_rating(&self, id: i64) -> Result<i64> {
        let rating: Option<i64> = self.get_scalar(id, "rating")?;
        Ok(rating.unwrap_or(0))
    }

    pub fn set_rating(&self, id: i64, rating: i64) -> Result<()> {
        self.set_scalar(id, "rating", rating)
    }

    pub fn get_path(&self, id: i64) -> Result<String> {
        let path: Option<String> = self.get_scalar(id, "path")?;
        Ok(path.unwrap_or_default())
    }

    /// Updating the path keeps the derived filename column in step
    pub fn set_path(&self, id: i64, path: &str, filename: &str) -> Result<()> {
        self.storage.with_conn(|conn| {
            let changes = conn.execute(
                "UPDATE Track SET path = ?1, filename = ?2 WHERE id = ?3",
                params![path, filename, id],
            )?;
            if changes == 0 {
                return Err(Error::TrackDeleted(id));
            }
            Ok(())
        })
    }

    pub fn get_filename(&self, id: i64) -> Result<String> {
        let filename: Option<String> = self.get_scalar(id, "filename")?;
        Ok(filename.unwrap_or_default())
    }

    pub fn get_time_last_played(&self, id: i64) -> Result<Option<i64>> {
        self.get_scalar(id, "timeLastPlayed")
    }

    pub fn set_time_last_played(&self, id: i64, time: Option<i64>) -> Result<()> {
        self.set_scalar(id, "timeLastPlayed", time)
    }

    pub fn get_album_art_id(&self, id: i64) -> Result<i64> {
        let art: Option<i64> = self.get_scalar(id, self.album_art_column())?;
        Ok(art.unwrap_or(1))
    }

    pub fn set_album_art_id(&self, id: i64, album_art_id: i64) -> Result<()> {
        self.set_scalar(id, self.album_art_column(), album_art_id)
    }

    pub fn get_origin_database_uuid(&self, id: i64) -> Result<String> {
        let uuid: Option<String> = self.get_scalar(id, self.origin_uuid_column())?;
        Ok(uuid.unwrap_or_default())
    }

    pub fn set_origin_database_uuid(&self, id: i64, uuid: &str) -> Result<()> {
        self.set_scalar(id, self.origin_uuid_column(), uuid.to_string())
    }

    pub fn get_origin_track_id(&self, id: i64) -> Result<i64> {
        let origin: Option<i64> = self.get_scalar(id, self.origin_track_id_column())?;
        Ok(origin.unwrap_or(0))
    }

    pub fn set_origin_track_id(&self, id: i64, origin_track_id: i64) -> Result<()> {
        self.set_scalar(id, self.origin_track_id_column(), origin_track_id)
    }

    pub fn get_track_data(&self, id: i64) -> Result<TrackDataBlob> {
        match self.get_blob_bytes(id, "trackData")? {
            Some(bytes) => TrackDataBlob::from_blob(&bytes),
            None => Ok(TrackDataBlob::default()),
        }
    }

    pub fn set_track_data(&self, id: i64, blob: &TrackDataBlob) -> Result<()> {
        self.set_blob_bytes(id, "trackData", blob.to_blob()?)
    }

    pub fn get_overview_waveform_data(&self, id: i64) -> Result<OverviewWaveformBlob> {
        match self.get_blob_bytes(id, "overviewWaveFormData")? {
            Some(bytes) => OverviewWaveformBlob::from_blob(&bytes),
            None => Ok(OverviewWaveformBlob::default()),
        }
    }

    pub fn set_overview_waveform_data(&self, id: i64, blob: &OverviewWaveformBlob) -> Result<()> {
        self.set_blob_bytes(id, "overviewWaveFormData", blob.to_blob()?)
    }

    pub fn get_beat_data(&self, id: i64) -> Result<BeatDataBlob> {
        match self.get_blob_bytes(id, "beatData")? {
            Some(bytes) => BeatDataBlob::from_blob(&bytes),
            None => Ok(BeatDataBlob::default()),
        }
    }

    pub fn set_beat_data(&self, id: i64, blob: &BeatDataBlob) -> Result<()> {
        self.set_blob_bytes(id, "beatData", blob.to_blob()?)
    }

    pub fn get_quick_cues(&self, id: i64) -> Result<QuickCuesBlob> {
        match self.get_blob_bytes(id, "quickCues")? {
            Some(bytes) => QuickCuesBlob::from_blob(&bytes),
            None => Ok(QuickCuesBlob::default()),
        }
    }

    pub fn set_quick_cues(&self, id: i64, blob: &QuickCuesBlob) -> Result<()> {
        self.set_blob_bytes(id, "quickCues", blob.to_blob()?)
    }

    pub fn get_loops(&self, id: i64) -> Result<LoopsBlob> {
        match self.get_blob_bytes(id, "loops")? {
            Some(bytes) => LoopsBlob::from_blob(&bytes),
            None => Ok(LoopsBlob::default()),
        }
    }

    pub fn set_loops(&self, id: i64, blob: &LoopsBlob) -> Result<()> {
        self.set_blob_bytes(id, "loops", blob.to_blob()?)
    }
}

fn decode_blob_columns(
    row: &mut TrackRow,
    track_data: Option<Vec<u8>>,
    waveform: Option<Vec<u8>>,
    beat_data: Option<Vec<u8>>,
    quick_cues: Option<Vec<u8>>,
    loops: Option<Vec<u8>>,
) -> Result<()> {
    if let Some(bytes) = track_data {
        row.track_data = TrackDataBlob::from_blob(&bytes)?;
    }
    if let Some(bytes) = waveform {
        row.overview_waveform_data = OverviewWaveformBlob::from_blob(&bytes)?;
    }
    if let Some(bytes) = beat_data {
        row.beat_data = BeatDataBlob::from_blob(&bytes)?;
    }
    if let Some(bytes) = quick_cues {
        row.quick_cues = QuickCuesBlob::from_blob(&bytes)?;
    }
    if let Some(bytes) = loops {
        row.loops = LoopsBlob::from_blob(&bytes)?;
    }
    Ok(())
}

/// One crate row, however the schema spells it
#[derive(Debug, Clone)]
pub struct CrateRow {
    pub id: i64,
    pub title: String,
    pub path: String,
}

pub(crate) struct CrateTable {
    storage: Arc<Storage>,
}

impl CrateTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.storage.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM Crate WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if count > 1 {
                return Err(Error::CrateDatabaseInconsistency {
                    message: "more than one crate with the same id".into(),
                    id,
                });
            }
            Ok(count == 1)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<CrateRow>> {
        self.storage.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT title, path FROM Crate WHERE id = ?1",
                    params![id],
                    |r| {
                        Ok(CrateRow {
                            id,
                            title: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
                            path: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        })
                    },
                )
                .optional()?)
        })
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM Crate ORDER BY id")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    /// Insert a crate row. List-backed schemas have no rowid to assign, so
    /// the next id is pre-computed there.
    pub fn add(&self, title: &str, path: &str) -> Result<i64> {
        let list_backed = self.storage.version().has_list_backed_crates();
        self.storage.with_write_section(|| {
            self.storage.with_conn(|conn| {
                if list_backed {
                    let id: i64 = conn.query_row(
                        "SELECT IFNULL(MAX(id), 0) + 1 FROM Crate",
                        [],
                        |r| r.get(0),
                    )?;
                    conn.execute(
                        "INSERT INTO Crate (id, title, path) VALUES (?1, ?2, ?3)",
                        params![id, title, path],
                    )?;
                    Ok(id)
                } else {
                    conn.execute(
                        "INSERT INTO Crate (title, path) VALUES (?1, ?2)",
                        params![title, path],
                    )?;
                    Ok(conn.last_insert_rowid())
                }
            })
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute("DELETE FROM Crate WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn set_title_and_path(&self, id: i64, title: &str, path: &str) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "UPDATE Crate SET title = ?1, path = ?2 WHERE id = ?3",
                params![title, path, id],
            )?;
            Ok(())
        })
    }

    pub fn ids_by_title(&self, title: &str) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM Crate WHERE title = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map(params![title], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn add_parent(&self, origin_id: i64, parent_id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO CrateParentList (crateOriginId, crateParentId) VALUES (?1, ?2)",
                params![origin_id, parent_id],
            )?;
            Ok(())
        })
    }

    /// The single parent edge every crate must have; a root crate's parent
    /// is itself.
    pub fn parent_id(&self, id: i64) -> Result<i64> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT crateParentId FROM CrateParentList WHERE crateOriginId = ?1")?;
            let parents = stmt
                .query_map(params![id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            match parents.as_slice() {
                [parent] => Ok(*parent),
                [] => Err(Error::CrateDatabaseInconsistency {
                    message: "crate has no parent row".into(),
                    id,
                }),
                _ => Err(Error::CrateDatabaseInconsistency {
                    message: "crate has more than one parent row".into(),
                    id,
                }),
            }
        })
    }

    pub fn child_ids(&self, id: i64) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT crateOriginId FROM CrateParentList \
                 WHERE crateParentId = ?1 AND crateOriginId <> crateParentId \
                 ORDER BY crateOriginId",
            )?;
            let ids = stmt
                .query_map(params![id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn root_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT crateOriginId FROM CrateParentList \
                 WHERE crateParentId = crateOriginId ORDER BY crateOriginId",
            )?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn root_id_by_title(&self, title: &str) -> Result<Option<i64>> {
        self.storage.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT cr.id FROM Crate cr \
                     JOIN CrateParentList cpl ON cpl.crateOriginId = cr.id \
                     WHERE cr.title = ?1 AND cpl.crateOriginId = cpl.crateParentId \
                     ORDER BY cr.id",
                    params![title],
                    |r| r.get(0),
                )
                .optional()?)
        })
    }

    pub fn track_ids(&self, crate_id: i64) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT trackId FROM CrateTrackList WHERE crateId = ?1 ORDER BY trackId",
            )?;
            let ids = stmt
                .query_map(params![crate_id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn add_track(&self, crate_id: i64, track_id: i64) -> Result<()> {
        self.storage.with_write_section(|| {
            self.storage.with_conn(|conn| {
                conn.execute(
                    "DELETE FROM CrateTrackList WHERE crateId = ?1 AND trackId = ?2",
                    params![crate_id, track_id],
                )?;
                conn.execute(
                    "INSERT INTO CrateTrackList (crateId, trackId) VALUES (?1, ?2)",
                    params![crate_id, track_id],
                )?;
                Ok(())
            })
        })
    }

    pub fn remove_track(&self, crate_id: i64, track_id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "DELETE FROM CrateTrackList WHERE crateId = ?1 AND trackId = ?2",
                params![crate_id, track_id],
            )?;
            Ok(())
        })
    }

    pub fn clear_tracks(&self, crate_id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "DELETE FROM CrateTrackList WHERE crateId = ?1",
                params![crate_id],
            )?;
            Ok(())
        })
    }
}

/// Album-art row; id 1 is the seeded "no art" sentinel
#[derive(Debug, Clone)]
pub struct AlbumArtRow {
    pub id: i64,
    pub hash: Option<String>,
    pub album_art: Option<Vec<u8>>,
}

pub(crate) struct AlbumArtTable {
    storage: Arc<Storage>,
}

impl AlbumArtTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.storage.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM AlbumArt WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            Ok(count == 1)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<AlbumArtRow>> {
        self.storage.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT hash, albumArt FROM AlbumArt WHERE id = ?1",
                    params![id],
                    |r| {
                        Ok(AlbumArtRow {
                            id,
                            hash: r.get(0)?,
                            album_art: r.get(1)?,
                        })
                    },
                )
                .optional()?)
        })
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM AlbumArt ORDER BY id")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn add(&self, hash: &str, album_art: &[u8]) -> Result<i64> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO AlbumArt (hash, albumArt) VALUES (?1, ?2)",
                params![hash, album_art],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute("DELETE FROM AlbumArt WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}

/// Ordered playlist membership. In v1 this is the `PlaylistTrackList` join
/// table; in v2 each membership is a `PlaylistEntity` row.
pub(crate) struct PlaylistTable {
    storage: Arc<Storage>,
}

impl PlaylistTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn add(&self, title: &str) -> Result<i64> {
        self.storage.with_conn(|conn| {
            conn.execute("INSERT INTO Playlist (title) VALUES (?1)", params![title])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM Playlist ORDER BY id")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn get_title(&self, id: i64) -> Result<Option<String>> {
        self.storage.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT title FROM Playlist WHERE id = ?1",
                    params![id],
                    |r| r.get::<_, Option<String>>(0),
                )
                .optional()?
                .flatten())
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute("DELETE FROM Playlist WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn add_track(&self, playlist_id: i64, track_id: i64) -> Result<()> {
        match self.storage.version().family {
            SchemaFamily::V1 => self.storage.with_conn(|conn| {
                conn.execute(
                    "INSERT INTO PlaylistTrackList (playlistId, trackId, trackNumber) \
                     VALUES (?1, ?2, (SELECT COUNT(*) + 1 FROM PlaylistTrackList \
                     WHERE playlistId = ?1))",
                    params![playlist_id, track_id],
                )?;
                Ok(())
            }),
            SchemaFamily::V2 => {
                PlaylistEntityTable::new(Arc::clone(&self.storage)).add(playlist_id, track_id)
            }
        }
    }

    pub fn track_ids(&self, playlist_id: i64) -> Result<Vec<i64>> {
        match self.storage.version().family {
            SchemaFamily::V1 => self.storage.with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT trackId FROM PlaylistTrackList WHERE playlistId = ?1 \
                     ORDER BY trackNumber",
                )?;
                let ids = stmt
                    .query_map(params![playlist_id], |r| r.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(ids)
            }),
            SchemaFamily::V2 => self.storage.with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT trackId FROM PlaylistEntity WHERE listId = ?1 ORDER BY id",
                )?;
                let ids = stmt
                    .query_map(params![playlist_id], |r| r.get(0))?
                    .collect::<rusqlite::Result<Vec<i64>>>()?;
                Ok(ids)
            }),
        }
    }
}

/// v2 playlist membership rows
pub(crate) struct PlaylistEntityTable {
    storage: Arc<Storage>,
}

impl PlaylistEntityTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn add(&self, list_id: i64, track_id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            let uuid: String = conn.query_row("SELECT uuid FROM Information", [], |r| r.get(0))?;
            conn.execute(
                "INSERT INTO PlaylistEntity (listId, trackId, databaseUuid, nextEntityId, \
                 membershipReference) VALUES (?1, ?2, ?3, 0, 0)",
                params![list_id, track_id, uuid],
            )?;
            Ok(())
        })
    }
}

/// v1 smart lists: rule text plus materialised memberships
pub(crate) struct SmartlistTable {
    storage: Arc<Storage>,
}

impl SmartlistTable {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn add(&self, title: &str, rules: &str) -> Result<i64> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO Smartlist (title, smartlistRules) VALUES (?1, ?2)",
                params![title, rules],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn all_ids(&self) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT listId FROM Smartlist ORDER BY listId")?;
            let ids = stmt
                .query_map([], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute("DELETE FROM Smartlist WHERE listId = ?1", params![id])?;
            Ok(())
        })
    }

    pub fn add_track(&self, list_id: i64, track_id: i64) -> Result<()> {
        self.storage.with_conn(|conn| {
            conn.execute(
                "INSERT INTO SmartlistTrackList (listId, trackId) VALUES (?1, ?2)",
                params![list_id, track_id],
            )?;
            Ok(())
        })
    }

    pub fn track_ids(&self, list_id: i64) -> Result<Vec<i64>> {
        self.storage.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT trackId FROM SmartlistTrackList WHERE listId = ?1")?;
            let ids = stmt
                .query_map(params![list_id], |r| r.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()?;
            Ok(ids)
        })
    }
}
