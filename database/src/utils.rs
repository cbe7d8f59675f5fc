use crate::db::{open_db, DB};
use std::sync::Arc;
use tempfile::TempDir;

/// Keeps the temp directory alive for as long as the DB is in use
pub struct TempDbLifetime {
    _tempdir: TempDir,
}

/// Creates a DB within a temporary directory, returning a lifetime guard which
/// removes the directory when dropped
pub fn create_temp_db() -> (TempDbLifetime, Arc<DB>) {
    let tempdir = tempfile::tempdir().expect("creating a temp dir should succeed");
    let db = open_db(tempdir.path(), true, 1);
    (TempDbLifetime { _tempdir: tempdir }, db)
}
