//! Fatal build failures.
//!
//! Everything here aborts the run without producing a new snapshot; the
//! previously-installed database stays authoritative. Per-document problems
//! are *not* errors in this sense — they are [`crate::report::BuildError`]
//! records collected by the driver.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BuildFailure>;

#[derive(Error, Debug)]
pub enum BuildFailure {
    #[error("Source root not found: {0}")]
    SourceRootMissing(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] plughub_store_db::Error),

    #[error("Failed to install snapshot at '{path}': {source}")]
    Install {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Extension trait for adding context to IO errors
pub trait IoErrorContext<T> {
    fn io_context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> IoErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn io_context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| BuildFailure::Io {
            context: context.into(),
            source: e,
        })
    }
}
