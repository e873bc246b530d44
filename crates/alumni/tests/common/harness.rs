#![allow(dead_code)]

use std::path::{Path, PathBuf};

use alumni::storage::PhotoStore;
use alumni::Database;
use tempfile::TempDir;

/// A throwaway data directory holding a SQLite store and an uploads
/// folder.
///
/// The directory is removed when the harness is dropped, so keep the
/// harness alive for as long as the database is in use.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Path of the SQLite file under `data/`.
    pub db_path: PathBuf,
    /// Root handed to [`PhotoStore`].
    pub uploads_dir: PathBuf,
    pub db: Database,
}

impl TestHarness {
    /// Creates the directory layout and opens (and migrates) the store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("data").join("alumni.db");
        let uploads_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&uploads_dir).expect("Failed to create uploads dir");

        let db = Database::open(&db_path).expect("Failed to open database");

        Self {
            temp_dir,
            db_path,
            uploads_dir,
            db,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Opens a second handle on the same file, as a restarted server would.
    pub fn reopen(&self) -> Database {
        Database::open(&self.db_path).expect("Failed to reopen database")
    }

    pub fn photo_store(&self) -> PhotoStore {
        PhotoStore::new(&self.uploads_dir, "http://localhost:7100")
    }

    /// Writes `content` to `name` inside the temp directory.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
