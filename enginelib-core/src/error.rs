//! Error types for enginelib-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid crate name: {name:?}: {reason}")]
    CrateInvalidName { name: String, reason: &'static str },

    #[error("Crate database inconsistency for id {id}: {message}")]
    CrateDatabaseInconsistency { message: String, id: i64 },

    #[error("Track database inconsistency for id {id}: {message}")]
    TrackDatabaseInconsistency { message: String, id: i64 },

    #[error("Track {0} has been deleted")]
    TrackDeleted(i64),

    #[error("Invalid track snapshot: {0}")]
    InvalidTrackSnapshot(String),

    #[error("Malformed blob: {0}")]
    MalformedBlob(String),

    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("Unknown schema version: {0}")]
    UnknownVersion(String),

    #[error("A transaction is already in progress")]
    AlreadyInTransaction,
}

pub type Result<T> = std::result::Result<T, Error>;
