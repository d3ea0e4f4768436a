//! Physical storage: database files, the v1 two-file layout and transactions
//!
//! A `Storage` owns the SQLite connection for one database directory. The v1
//! layout keeps the music catalog in `m.db` and performance data in `p.db`;
//! the performance file is attached to the music connection under the `perf`
//! alias so one BEGIN/COMMIT spans both. The v2 layout is `m.db` alone.
//!
//! There is a single logical writer per database. A transaction guard marks
//! the storage busy; committing flushes, dropping the guard without a commit
//! rolls back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::schema::{self, EngineVersion, SchemaFamily};

/// Music catalog file name
pub const MUSIC_DB_FILE: &str = "m.db";

/// Performance data file name (v1 layout only)
pub const PERFORMANCE_DB_FILE: &str = "p.db";

/// Alias the performance database is attached under
pub const PERFORMANCE_ALIAS: &str = "perf";

pub(crate) struct Storage {
    conn: Mutex<Connection>,
    version: Mutex<EngineVersion>,
    directory: PathBuf,
    in_transaction: AtomicBool,
}

impl Storage {
    /// True when `dir` already holds a music database file
    pub fn exists(dir: &Path) -> bool {
        dir.join(MUSIC_DB_FILE).exists()
    }

    /// Create a fresh database of the given version in `dir` and open it.
    /// If any creation step fails, no file is left behind.
    pub fn create(dir: &Path, version: EngineVersion) -> Result<Arc<Self>> {
        Self::create_with_scripts(
            dir,
            version,
            version.music_script(),
            version.performance_script(),
        )
    }

    /// Create a database by replaying creation scripts read from `scripts_dir`
    /// (`m.sql`, plus `p.sql` for two-file versions).
    pub fn create_from_script_dir(
        dir: &Path,
        version: EngineVersion,
        scripts_dir: &Path,
    ) -> Result<Arc<Self>> {
        let music_script = fs::read_to_string(scripts_dir.join("m.sql"))?;
        let performance_script = match version.family {
            SchemaFamily::V1 => Some(fs::read_to_string(scripts_dir.join("p.sql"))?),
            SchemaFamily::V2 => None,
        };
        Self::create_with_scripts(dir, version, &music_script, performance_script.as_deref())
    }

    fn create_with_scripts(
        dir: &Path,
        version: EngineVersion,
        music_script: &str,
        performance_script: Option<&str>,
    ) -> Result<Arc<Self>> {
        fs::create_dir_all(dir)?;
        let music_path = dir.join(MUSIC_DB_FILE);
        let perf_path = dir.join(PERFORMANCE_DB_FILE);
        let uuid = schema::fresh_database_uuid();

        let created = (|| -> Result<()> {
            let conn = Connection::open(&music_path)?;
            schema::create_schema(&conn, music_script, &uuid, version.music_schema, true)?;
            drop(conn);
            if let Some(script) = performance_script {
                let conn = Connection::open(&perf_path)?;
                schema::create_schema(&conn, script, &uuid, version.performance_schema, false)?;
            }
            Ok(())
        })();
        if let Err(e) = created {
            // Neither file may survive a failed creation.
            let _ = fs::remove_file(&music_path);
            let _ = fs::remove_file(&perf_path);
            return Err(e);
        }

        info!(directory = %dir.display(), version = %version, "created database");
        Self::open(dir)
    }

    /// Open an existing database directory, recognising its stored version
    pub fn open(dir: &Path) -> Result<Arc<Self>> {
        let music_path = dir.join(MUSIC_DB_FILE);
        if !music_path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no {MUSIC_DB_FILE} in {}", dir.display()),
            )));
        }

        let conn = Connection::open(&music_path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let music_schema = schema::read_schema_version(&conn, "main")?;
        let version = schema::version_by_music_schema(music_schema)?;

        if version.family == SchemaFamily::V1 {
            let perf_path = dir.join(PERFORMANCE_DB_FILE);
            if !perf_path.exists() {
                return Err(Error::SchemaMismatch {
                    expected: format!("{PERFORMANCE_DB_FILE} alongside {MUSIC_DB_FILE}"),
                    found: format!("no {PERFORMANCE_DB_FILE} in {}", dir.display()),
                });
            }
            conn.execute(
                &format!("ATTACH DATABASE ?1 AS {PERFORMANCE_ALIAS}"),
                params![perf_path.to_string_lossy()],
            )?;
            let perf_schema = schema::read_schema_version(&conn, PERFORMANCE_ALIAS)?;
            if perf_schema != version.performance_schema {
                return Err(Error::SchemaMismatch {
                    expected: format!("performance schema {}", version.performance_schema),
                    found: format!("performance schema {perf_schema}"),
                });
            }
        }

        debug!(directory = %dir.display(), version = %version, "opened database");
        Ok(Arc::new(Self {
            conn: Mutex::new(conn),
            version: Mutex::new(version),
            directory: dir.to_path_buf(),
            in_transaction: AtomicBool::new(false),
        }))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn version(&self) -> EngineVersion {
        *self.version.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a closure against the connection. Callers hold the lock only for
    /// the duration of the closure; no lock is held between public calls.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn)
    }

    /// Verify the live structure of every file against this version's scripts
    pub fn verify(&self) -> Result<()> {
        let version = self.version();
        self.with_conn(|conn| {
            schema::verify_database(conn, "main", version.music_script())?;
            if let Some(script) = version.performance_script() {
                schema::verify_database(conn, PERFORMANCE_ALIAS, script)?;
            }
            Ok(())
        })
    }

    /// Upgrade to the next version in the registry
    pub fn upgrade_to(&self, to: EngineVersion) -> Result<()> {
        if self.in_transaction.load(Ordering::SeqCst) {
            return Err(Error::AlreadyInTransaction);
        }
        let from = self.version();
        self.with_conn(|conn| schema::upgrade(conn, from, to))?;
        *self.version.lock().unwrap_or_else(|e| e.into_inner()) = to;
        Ok(())
    }

    /// Begin the single writer transaction. Fails if one is already open.
    pub fn begin_transaction(self: &Arc<Self>) -> Result<TransactionGuard> {
        if self.in_transaction.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyInTransaction);
        }
        let begun = self.with_conn(|conn| {
            conn.execute_batch("BEGIN TRANSACTION")?;
            Ok(())
        });
        if let Err(e) = begun {
            self.in_transaction.store(false, Ordering::SeqCst);
            return Err(e);
        }
        debug!("transaction started");
        Ok(TransactionGuard {
            storage: Arc::clone(self),
            committed: false,
        })
    }

    /// Run a multi-statement mutation atomically: joins the caller's open
    /// transaction when there is one, otherwise wraps `f` in its own.
    pub fn with_write_section<T>(self: &Arc<Self>, f: impl FnOnce() -> Result<T>) -> Result<T> {
        if self.in_transaction.load(Ordering::SeqCst) {
            return f();
        }
        let guard = self.begin_transaction()?;
        let value = f()?;
        guard.commit()?;
        Ok(value)
    }
}

/// Scoped unit of work. `commit` flushes both physical files; dropping the
/// guard without committing rolls everything back.
pub struct TransactionGuard {
    storage: Arc<Storage>,
    committed: bool,
}

impl TransactionGuard {
    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        let result = self.storage.with_conn(|conn| {
            conn.execute_batch("COMMIT")?;
            Ok(())
        });
        if result.is_err() {
            let _ = self.storage.with_conn(|conn| {
                conn.execute_batch("ROLLBACK")?;
                Ok(())
            });
        }
        self.storage.in_transaction.store(false, Ordering::SeqCst);
        debug!("transaction committed");
        result
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = self.storage.with_conn(|conn| {
                conn.execute_batch("ROLLBACK")?;
                Ok(())
            });
            self.storage.in_transaction.store(false, Ordering::SeqCst);
            debug!("transaction rolled back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DESKTOP_2_0_0, FIRMWARE_1_0_0, VERSION_LATEST_V1};
    use tempfile::TempDir;

    #[test]
    fn test_create_v1_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::create(tmp.path(), FIRMWARE_1_0_0).unwrap();
        assert!(tmp.path().join(MUSIC_DB_FILE).exists());
        assert!(tmp.path().join(PERFORMANCE_DB_FILE).exists());
        storage.verify().unwrap();
    }

    #[test]
    fn test_create_v2_writes_single_file() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::create(tmp.path(), DESKTOP_2_0_0).unwrap();
        assert!(tmp.path().join(MUSIC_DB_FILE).exists());
        assert!(!tmp.path().join(PERFORMANCE_DB_FILE).exists());
        storage.verify().unwrap();
    }

    #[test]
    fn test_open_recognises_stored_version() {
        let tmp = TempDir::new().unwrap();
        {
            Storage::create(tmp.path(), VERSION_LATEST_V1).unwrap();
        }
        let storage = Storage::open(tmp.path()).unwrap();
        assert_eq!(storage.version(), VERSION_LATEST_V1);
    }

    #[test]
    fn test_open_missing_performance_file_fails() {
        let tmp = TempDir::new().unwrap();
        {
            Storage::create(tmp.path(), FIRMWARE_1_0_0).unwrap();
        }
        fs::remove_file(tmp.path().join(PERFORMANCE_DB_FILE)).unwrap();
        assert!(matches!(
            Storage::open(tmp.path()),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_open_unknown_version_fails() {
        let tmp = TempDir::new().unwrap();
        {
            Storage::create(tmp.path(), DESKTOP_2_0_0).unwrap();
        }
        {
            let conn = Connection::open(tmp.path().join(MUSIC_DB_FILE)).unwrap();
            conn.execute("UPDATE Information SET schemaVersionMajor = 9", [])
                .unwrap();
        }
        assert!(matches!(
            Storage::open(tmp.path()),
            Err(Error::UnknownVersion(_))
        ));
    }

    #[test]
    fn test_nested_transaction_rejected() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::create(tmp.path(), DESKTOP_2_0_0).unwrap();
        let guard = storage.begin_transaction().unwrap();
        assert!(matches!(
            storage.begin_transaction(),
            Err(Error::AlreadyInTransaction)
        ));
        guard.commit().unwrap();
        let guard = storage.begin_transaction().unwrap();
        drop(guard);
        storage.begin_transaction().unwrap().commit().unwrap();
    }

    #[test]
    fn test_dropped_guard_rolls_back() {
        let tmp = TempDir::new().unwrap();
        let storage = Storage::create(tmp.path(), DESKTOP_2_0_0).unwrap();
        {
            let _guard = storage.begin_transaction().unwrap();
            storage
                .with_conn(|conn| {
                    conn.execute(
                        "INSERT INTO Playlist (title) VALUES ('doomed')",
                        [],
                    )?;
                    Ok(())
                })
                .unwrap();
        }
        let count: i64 = storage
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM Playlist", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }
}
