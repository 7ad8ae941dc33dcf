//! Shared handle to the snapshot being served.
//!
//! The database is opened read-only once at startup and pinned for the
//! process lifetime; a rebuild replaces the file via rename without touching
//! this handle. The generation id is a digest of the database file's bytes,
//! so two processes serving identical snapshots agree on it.

use std::path::Path;

use log::info;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, MutexGuard};

use plughub_store_db::StoreDb;

use crate::error::{IoErrorContext, Result};

pub(crate) struct Catalog {
    db: Mutex<StoreDb>,
    generation: String,
}

impl Catalog {
    /// Open the snapshot and fingerprint its content.
    pub(crate) fn open(db_path: &Path) -> Result<Catalog> {
        let generation = file_digest(db_path)?;
        let db = StoreDb::open_snapshot(db_path)?;
        info!(
            "Serving snapshot {} (generation {})",
            db_path.display(),
            &generation[..12]
        );
        Ok(Catalog {
            db: Mutex::new(db),
            generation,
        })
    }

    pub(crate) async fn db(&self) -> MutexGuard<'_, StoreDb> {
        self.db.lock().await
    }

    /// Content-derived generation id; part of every response cache key.
    pub(crate) fn generation(&self) -> &str {
        &self.generation
    }
}

fn file_digest(path: &Path) -> Result<String> {
    let contents =
        std::fs::read(path).io_context(format!("Failed to read database at {}", path.display()))?;
    Ok(hex::encode(Sha256::digest(&contents)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plughub_store_db::OpenMode;

    #[test]
    fn test_generation_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.db");
        {
            let db = StoreDb::open(&path, OpenMode::Create).unwrap();
            db.create_schema().unwrap();
        }
        let first = file_digest(&path).unwrap();
        assert_eq!(first, file_digest(&path).unwrap());
    }
}
