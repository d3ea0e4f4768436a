//! Schema registry: version enumeration, creation scripts, verification and
//! upgrades
//!
//! Every supported on-disk layout is identified by a triple of engine
//! version, music schema version and performance schema version. The
//! registry is a linear list in release order; creation DDL for each version
//! lives under `ref/engine/**` and is embedded here, so the same scripts
//! serve as reference data for tests and as the creation path.
//!
//! Verification is structural: the live database's tables, columns, indices,
//! views and triggers are diffed against a pristine in-memory database built
//! from the version's script. Any divergence is a schema mismatch.

use std::collections::BTreeMap;
use std::fmt;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A dotted three-part schema version as stored in the `Information` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl SchemaVersion {
    pub const fn new(major: i32, minor: i32, patch: i32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Physical layout family: v1 splits the library across a music catalog and
/// a performance-data file, v2 keeps everything in one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFamily {
    V1,
    V2,
}

/// One supported on-disk layout
#[derive(Debug, Clone, Copy)]
pub struct EngineVersion {
    /// Human-readable release name
    pub name: &'static str,
    pub engine: SchemaVersion,
    pub music_schema: SchemaVersion,
    pub performance_schema: SchemaVersion,
    pub family: SchemaFamily,
    /// Path of this version's scripts below `ref/engine/`
    pub script_dir: &'static str,
    music_script: &'static str,
    performance_script: Option<&'static str>,
}

impl PartialEq for EngineVersion {
    fn eq(&self, other: &Self) -> bool {
        self.engine == other.engine
            && self.music_schema == other.music_schema
            && self.performance_schema == other.performance_schema
    }
}

impl Eq for EngineVersion {}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (schema {})", self.name, self.music_schema)
    }
}

impl EngineVersion {
    pub fn music_script(&self) -> &'static str {
        self.music_script
    }

    pub fn performance_script(&self) -> Option<&'static str> {
        self.performance_script
    }

    /// Crates live in the generic `List` table from music schema 1.9.1
    /// onward; their ids must be pre-computed by the writer.
    pub fn has_list_backed_crates(&self) -> bool {
        self.music_schema >= SchemaVersion::new(1, 9, 1)
    }
}

pub const FIRMWARE_1_0_0: EngineVersion = EngineVersion {
    name: "SC5000 Firmware 1.0.0",
    engine: SchemaVersion::new(1, 0, 0),
    music_schema: SchemaVersion::new(1, 6, 0),
    performance_schema: SchemaVersion::new(1, 0, 0),
    family: SchemaFamily::V1,
    script_dir: "os/firmware-1.0.0",
    music_script: include_str!("../ref/engine/os/firmware-1.0.0/m.sql"),
    performance_script: Some(include_str!("../ref/engine/os/firmware-1.0.0/p.sql")),
};

pub const FIRMWARE_1_0_3: EngineVersion = EngineVersion {
    name: "SC5000 Firmware 1.0.3",
    engine: SchemaVersion::new(1, 0, 3),
    music_schema: SchemaVersion::new(1, 7, 1),
    performance_schema: SchemaVersion::new(1, 0, 0),
    family: SchemaFamily::V1,
    script_dir: "os/firmware-1.0.3",
    music_script: include_str!("../ref/engine/os/firmware-1.0.3/m.sql"),
    performance_script: Some(include_str!("../ref/engine/os/firmware-1.0.3/p.sql")),
};

pub const DESKTOP_1_1_1: EngineVersion = EngineVersion {
    name: "Engine Desktop 1.1.1",
    engine: SchemaVersion::new(1, 1, 1),
    music_schema: SchemaVersion::new(1, 9, 1),
    performance_schema: SchemaVersion::new(1, 0, 0),
    family: SchemaFamily::V1,
    script_dir: "desktop/desktop-1.1.1",
    music_script: include_str!("../ref/engine/desktop/desktop-1.1.1/m.sql"),
    performance_script: Some(include_str!("../ref/engine/desktop/desktop-1.1.1/p.sql")),
};

pub const DESKTOP_2_0_0: EngineVersion = EngineVersion {
    name: "Engine Desktop 2.0.0",
    engine: SchemaVersion::new(2, 0, 0),
    music_schema: SchemaVersion::new(2, 0, 0),
    performance_schema: SchemaVersion::new(2, 0, 0),
    family: SchemaFamily::V2,
    script_dir: "desktop/desktop-2.0.0",
    music_script: include_str!("../ref/engine/desktop/desktop-2.0.0/m.sql"),
    performance_script: None,
};

/// Every supported version, in release order
pub const ALL_VERSIONS: [EngineVersion; 4] = [
    FIRMWARE_1_0_0,
    FIRMWARE_1_0_3,
    DESKTOP_1_1_1,
    DESKTOP_2_0_0,
];

/// The newest supported version
pub const VERSION_LATEST: EngineVersion = DESKTOP_2_0_0;

/// The newest version using the two-file v1 layout
pub const VERSION_LATEST_V1: EngineVersion = DESKTOP_1_1_1;

/// Look up the registry entry whose music schema matches a stored version
pub fn version_by_music_schema(music_schema: SchemaVersion) -> Result<EngineVersion> {
    ALL_VERSIONS
        .iter()
        .find(|v| v.music_schema == music_schema)
        .copied()
        .ok_or_else(|| Error::UnknownVersion(music_schema.to_string()))
}

/// Run a creation script and seed the fresh database's `Information` row and
/// album-art sentinel. Returns nothing; the caller owns file lifecycle.
pub fn create_schema(
    conn: &Connection,
    script: &str,
    uuid: &str,
    schema_version: SchemaVersion,
    seed_album_art: bool,
) -> Result<()> {
    conn.execute_batch(script)?;
    conn.execute(
        "INSERT INTO Information (uuid, schemaVersionMajor, schemaVersionMinor, \
         schemaVersionPatch, currentPlayedIndiciator) VALUES (?1, ?2, ?3, ?4, 0)",
        params![
            uuid,
            schema_version.major,
            schema_version.minor,
            schema_version.patch
        ],
    )?;
    if seed_album_art {
        // Id 1 is the "no art" sentinel every track points at by default.
        conn.execute(
            "INSERT INTO AlbumArt (id, hash, albumArt) VALUES (1, '', NULL)",
            [],
        )?;
    }
    debug!(uuid, version = %schema_version, "created schema");
    Ok(())
}

/// Generate the uuid shared by the files of one database
pub fn fresh_database_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Read the schema version stored in a database's `Information` table
pub fn read_schema_version(conn: &Connection, db: &str) -> Result<SchemaVersion> {
    let row = conn
        .query_row(
            &format!(
                "SELECT schemaVersionMajor, schemaVersionMinor, schemaVersionPatch \
                 FROM {db}.Information"
            ),
            [],
            |r| {
                Ok(SchemaVersion::new(
                    r.get::<_, i32>(0)?,
                    r.get::<_, i32>(1)?,
                    r.get::<_, i32>(2)?,
                ))
            },
        )
        .optional()?;
    row.ok_or_else(|| Error::UnknownVersion("no Information row".into()))
}

/// Structural fingerprint of one database: object names plus column
/// signatures, keyed so a map comparison finds the first divergence.
fn collect_structure(conn: &Connection, db: &str) -> Result<BTreeMap<String, String>> {
    let mut structure = BTreeMap::new();
    let mut relations = Vec::new();

    let mut stmt = conn.prepare(&format!(
        "SELECT type, name, tbl_name FROM {db}.sqlite_master \
         WHERE name NOT LIKE 'sqlite_%'"
    ))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let object_type: String = row.get(0)?;
        let name: String = row.get(1)?;
        let tbl_name: String = row.get(2)?;
        if object_type == "table" || object_type == "view" {
            relations.push(name.clone());
        }
        structure.insert(format!("{object_type} {name}"), tbl_name);
    }

    for relation in relations {
        let mut stmt = conn.prepare(&format!("PRAGMA {db}.table_info({relation})"))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let column: String = row.get(1)?;
            let column_type: String = row.get(2)?;
            let notnull: i32 = row.get(3)?;
            let pk: i32 = row.get(5)?;
            structure.insert(
                format!("column {relation}.{column}"),
                format!(
                    "{} notnull={notnull} pk={pk}",
                    column_type.to_ascii_uppercase()
                ),
            );
        }
    }

    Ok(structure)
}

/// Verify one database (addressed by its connection alias) against the
/// structure its creation script produces.
pub fn verify_database(conn: &Connection, db: &str, script: &str) -> Result<()> {
    let reference = Connection::open_in_memory()?;
    reference.execute_batch(script)?;
    let expected = collect_structure(&reference, "main")?;
    let found = collect_structure(conn, db)?;

    for (key, expected_signature) in &expected {
        match found.get(key) {
            None => {
                return Err(Error::SchemaMismatch {
                    expected: format!("{key} ({expected_signature})"),
                    found: format!("{key} missing"),
                })
            }
            Some(signature) if signature != expected_signature => {
                return Err(Error::SchemaMismatch {
                    expected: format!("{key} ({expected_signature})"),
                    found: format!("{key} ({signature})"),
                })
            }
            _ => {}
        }
    }
    for key in found.keys() {
        if !expected.contains_key(key) {
            return Err(Error::SchemaMismatch {
                expected: format!("no {key}"),
                found: key.clone(),
            });
        }
    }
    Ok(())
}

// Delta DDL between consecutive versions of the v1 music schema.

const UPGRADE_MUSIC_1_6_0_TO_1_7_1: &str = "
CREATE TABLE Playlist (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT
);

CREATE TABLE PlaylistTrackList (
    playlistId INTEGER REFERENCES Playlist (id) ON DELETE CASCADE,
    trackId INTEGER REFERENCES Track (id) ON DELETE CASCADE,
    trackNumber INTEGER
);

CREATE INDEX index_PlaylistTrackList_playlistId ON PlaylistTrackList (playlistId);
CREATE INDEX index_PlaylistTrackList_trackId ON PlaylistTrackList (trackId);

CREATE TABLE Smartlist (
    listId INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    smartlistRules TEXT
);

CREATE TABLE SmartlistTrackList (
    listId INTEGER REFERENCES Smartlist (listId) ON DELETE CASCADE,
    trackId INTEGER REFERENCES Track (id) ON DELETE CASCADE
);

CREATE INDEX index_SmartlistTrackList_listId ON SmartlistTrackList (listId);
CREATE INDEX index_SmartlistTrackList_trackId ON SmartlistTrackList (trackId);

CREATE INDEX index_Track_filename ON Track (filename);
";

const UPGRADE_MUSIC_1_7_1_TO_1_9_1: &str = "
CREATE TABLE List (
    id INTEGER NOT NULL,
    type INTEGER NOT NULL,
    title TEXT,
    path TEXT,
    isFolder NUMERIC,
    PRIMARY KEY (id, type)
);

CREATE INDEX index_List_title ON List (title);

CREATE TABLE ListParentList (
    listOriginId INTEGER,
    listOriginType INTEGER,
    listParentId INTEGER,
    listParentType INTEGER,
    FOREIGN KEY (listOriginId, listOriginType)
        REFERENCES List (id, type) ON DELETE CASCADE
);

CREATE INDEX index_ListParentList_listOriginId ON ListParentList (listOriginId);

CREATE TABLE ListTrackList (
    listId INTEGER,
    listType INTEGER,
    trackId INTEGER REFERENCES Track (id) ON DELETE CASCADE,
    trackNumber INTEGER,
    FOREIGN KEY (listId, listType)
        REFERENCES List (id, type) ON DELETE CASCADE
);

CREATE INDEX index_ListTrackList_listId ON ListTrackList (listId);
CREATE INDEX index_ListTrackList_trackId ON ListTrackList (trackId);

INSERT INTO List (id, type, title, path, isFolder)
    SELECT id, 1, title, path, 1 FROM Crate;
INSERT INTO ListParentList (listOriginId, listOriginType, listParentId, listParentType)
    SELECT crateOriginId, 1, crateParentId, 1 FROM CrateParentList;
INSERT INTO ListTrackList (listId, listType, trackId, trackNumber)
    SELECT crateId, 1, trackId, NULL FROM CrateTrackList;

DROP INDEX index_CrateTrackList_crateId;
DROP INDEX index_CrateTrackList_trackId;
DROP INDEX index_CrateParentList_crateOriginId;
DROP INDEX index_Crate_title;
DROP TABLE CrateTrackList;
DROP TABLE CrateParentList;
DROP TABLE Crate;

CREATE VIEW Crate AS
    SELECT id, title, path FROM List WHERE type = 1;

CREATE TRIGGER trigger_Crate_insert INSTEAD OF INSERT ON Crate
BEGIN
    INSERT INTO List (id, type, title, path, isFolder)
        VALUES (NEW.id, 1, NEW.title, NEW.path, 1);
END;

CREATE TRIGGER trigger_Crate_update INSTEAD OF UPDATE ON Crate
BEGIN
    UPDATE List SET title = NEW.title, path = NEW.path
    WHERE id = OLD.id AND type = 1;
END;

CREATE TRIGGER trigger_Crate_delete INSTEAD OF DELETE ON Crate
BEGIN
    DELETE FROM List WHERE id = OLD.id AND type = 1;
END;

CREATE VIEW CrateParentList AS
    SELECT listOriginId AS crateOriginId, listParentId AS crateParentId
    FROM ListParentList
    WHERE listOriginType = 1 AND listParentType = 1;

CREATE TRIGGER trigger_CrateParentList_insert INSTEAD OF INSERT ON CrateParentList
BEGIN
    INSERT INTO ListParentList (listOriginId, listOriginType, listParentId, listParentType)
        VALUES (NEW.crateOriginId, 1, NEW.crateParentId, 1);
END;

CREATE TRIGGER trigger_CrateParentList_delete INSTEAD OF DELETE ON CrateParentList
BEGIN
    DELETE FROM ListParentList
    WHERE listOriginId = OLD.crateOriginId AND listOriginType = 1
      AND listParentId = OLD.crateParentId AND listParentType = 1;
END;

CREATE VIEW CrateTrackList AS
    SELECT listId AS crateId, trackId FROM ListTrackList WHERE listType = 1;

CREATE TRIGGER trigger_CrateTrackList_insert INSTEAD OF INSERT ON CrateTrackList
BEGIN
    INSERT INTO ListTrackList (listId, listType, trackId, trackNumber)
        VALUES (NEW.crateId, 1, NEW.trackId, NULL);
END;

CREATE TRIGGER trigger_CrateTrackList_delete INSTEAD OF DELETE ON CrateTrackList
BEGIN
    DELETE FROM ListTrackList
    WHERE listId = OLD.crateId AND listType = 1 AND trackId = OLD.trackId;
END;
";

fn music_upgrade_delta(from: SchemaVersion, to: SchemaVersion) -> Option<&'static str> {
    match (from, to) {
        (f, t)
            if f == SchemaVersion::new(1, 6, 0) && t == SchemaVersion::new(1, 7, 1) =>
        {
            Some(UPGRADE_MUSIC_1_6_0_TO_1_7_1)
        }
        (f, t)
            if f == SchemaVersion::new(1, 7, 1) && t == SchemaVersion::new(1, 9, 1) =>
        {
            Some(UPGRADE_MUSIC_1_7_1_TO_1_9_1)
        }
        _ => None,
    }
}

/// The registry entry released immediately after `version`, if any
pub fn next_version(version: EngineVersion) -> Option<EngineVersion> {
    let position = ALL_VERSIONS.iter().position(|v| *v == version)?;
    ALL_VERSIONS.get(position + 1).copied()
}

/// Apply the delta DDL taking the music database from `from` to `to`.
///
/// Only consecutive versions within the v1 family have a delta; a jump
/// across the file-layout boundary is a physical relayout and is refused.
/// The delta and the `Information` bump run in one transaction; failure
/// rolls back.
pub fn upgrade(conn: &Connection, from: EngineVersion, to: EngineVersion) -> Result<()> {
    if next_version(from) != Some(to) || from.family != to.family {
        return Err(Error::UnknownVersion(format!(
            "no upgrade path from {} to {}",
            from, to
        )));
    }
    let delta = music_upgrade_delta(from.music_schema, to.music_schema).ok_or_else(|| {
        Error::UnknownVersion(format!("no upgrade path from {} to {}", from, to))
    })?;

    conn.execute_batch("BEGIN")?;
    let applied = conn
        .execute_batch(delta)
        .map_err(Error::from)
        .and_then(|_| {
            conn.execute(
                "UPDATE Information SET schemaVersionMajor = ?1, \
                 schemaVersionMinor = ?2, schemaVersionPatch = ?3",
                params![
                    to.music_schema.major,
                    to.music_schema.minor,
                    to.music_schema.patch
                ],
            )?;
            Ok(())
        });
    match applied {
        Ok(()) => {
            conn.execute_batch("COMMIT")?;
            info!(from = %from, to = %to, "upgraded music schema");
            Ok(())
        }
        Err(e) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(version: EngineVersion) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(
            &conn,
            version.music_script(),
            "test-uuid",
            version.music_schema,
            true,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_registry_is_release_ordered() {
        for pair in ALL_VERSIONS.windows(2) {
            assert!(pair[0].engine < pair[1].engine);
        }
        assert_eq!(VERSION_LATEST, DESKTOP_2_0_0);
    }

    #[test]
    fn test_version_lookup() {
        let version = version_by_music_schema(SchemaVersion::new(1, 7, 1)).unwrap();
        assert_eq!(version, FIRMWARE_1_0_3);
        assert!(matches!(
            version_by_music_schema(SchemaVersion::new(9, 9, 9)),
            Err(Error::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_created_music_schema_verifies() {
        for version in ALL_VERSIONS {
            let conn = created(version);
            verify_database(&conn, "main", version.music_script()).unwrap();
        }
    }

    #[test]
    fn test_created_performance_schema_verifies() {
        for version in ALL_VERSIONS {
            let Some(script) = version.performance_script() else {
                continue;
            };
            let conn = Connection::open_in_memory().unwrap();
            create_schema(&conn, script, "test-uuid", version.performance_schema, false)
                .unwrap();
            verify_database(&conn, "main", script).unwrap();
        }
    }

    #[test]
    fn test_verify_detects_missing_table() {
        let conn = created(FIRMWARE_1_0_0);
        conn.execute_batch("DROP TABLE CrateTrackList").unwrap();
        let result = verify_database(&conn, "main", FIRMWARE_1_0_0.music_script());
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
    }

    #[test]
    fn test_verify_detects_extra_table() {
        let conn = created(FIRMWARE_1_0_0);
        conn.execute_batch("CREATE TABLE Extra (id INTEGER)").unwrap();
        assert!(verify_database(&conn, "main", FIRMWARE_1_0_0.music_script()).is_err());
    }

    #[test]
    fn test_verify_detects_column_drift() {
        let conn = created(FIRMWARE_1_0_0);
        conn.execute_batch("ALTER TABLE Crate ADD COLUMN extra TEXT")
            .unwrap();
        assert!(verify_database(&conn, "main", FIRMWARE_1_0_0.music_script()).is_err());
    }

    #[test]
    fn test_upgrade_chain_verifies_at_each_step() {
        let conn = created(FIRMWARE_1_0_0);
        let mut version = FIRMWARE_1_0_0;
        while let Some(next) = next_version(version) {
            if next.family != version.family {
                break;
            }
            upgrade(&conn, version, next).unwrap();
            verify_database(&conn, "main", next.music_script()).unwrap();
            assert_eq!(read_schema_version(&conn, "main").unwrap(), next.music_schema);
            version = next;
        }
        assert_eq!(version, DESKTOP_1_1_1);
    }

    #[test]
    fn test_upgrade_migrates_crate_rows_into_list() {
        let conn = created(FIRMWARE_1_0_3);
        conn.execute(
            "INSERT INTO Crate (title, path) VALUES ('House', 'House;')",
            [],
        )
        .unwrap();
        let id: i64 = conn
            .query_row("SELECT id FROM Crate WHERE title = 'House'", [], |r| r.get(0))
            .unwrap();
        conn.execute(
            "INSERT INTO CrateParentList (crateOriginId, crateParentId) VALUES (?1, ?1)",
            params![id],
        )
        .unwrap();

        upgrade(&conn, FIRMWARE_1_0_3, DESKTOP_1_1_1).unwrap();

        let title: String = conn
            .query_row("SELECT title FROM Crate WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(title, "House");
        let parent: i64 = conn
            .query_row(
                "SELECT crateParentId FROM CrateParentList WHERE crateOriginId = ?1",
                params![id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(parent, id);
    }

    #[test]
    fn test_cross_family_upgrade_refused() {
        let conn = created(DESKTOP_1_1_1);
        let result = upgrade(&conn, DESKTOP_1_1_1, DESKTOP_2_0_0);
        assert!(matches!(result, Err(Error::UnknownVersion(_))));
    }

    #[test]
    fn test_non_consecutive_upgrade_refused() {
        let conn = created(FIRMWARE_1_0_0);
        let result = upgrade(&conn, FIRMWARE_1_0_0, DESKTOP_1_1_1);
        assert!(matches!(result, Err(Error::UnknownVersion(_))));
    }
}
