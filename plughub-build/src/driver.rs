//! Build driver: orchestrates the walk, the registry, and the snapshot
//! install.
//!
//! Per-document problems accumulate into the report; only infrastructure
//! failures abort. The new database is written to a temp file next to the
//! target and installed with an atomic rename, so a crash anywhere in here
//! leaves the previously-served snapshot untouched.

use std::path::{Path, PathBuf};

use plughub_store_db::{OpenMode, PluginType, Snapshot, StoreDb};
use tracing::info;

use crate::error::{BuildFailure, IoErrorContext, Result};
use crate::loader::{self, Walker};
use crate::registry::Registry;
use crate::report::{BuildError, BuildReport};

/// Inputs to one build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Root of the catalog source tree.
    pub source_root: PathBuf,
    /// Where the finished snapshot is installed.
    pub db_path: PathBuf,
    /// Source reference recorded for provenance and error links only.
    pub git_ref: Option<String>,
}

/// Run a complete build: walk, normalize, resolve, write, install.
pub fn build(options: &BuildOptions) -> Result<BuildReport> {
    if !options.source_root.is_dir() {
        return Err(BuildFailure::SourceRootMissing(options.source_root.clone()));
    }

    let mut errors: Vec<BuildError> = Vec::new();
    let mut registry = Registry::new();

    match loader::load_maintainer_profiles(&options.source_root) {
        Ok(profiles) => {
            for (id, profile) in profiles {
                registry.add_maintainer_profile(&id, profile.name, profile.url, profile.org);
            }
        }
        Err(e) => errors.push(e),
    }

    for item in Walker::new(&options.source_root)? {
        match item {
            Ok(document) => registry.add_document(document, &mut errors),
            Err(e) => errors.push(e),
        }
    }

    let snapshot = registry.resolve(options.git_ref.as_deref(), &mut errors);
    log_type_counts(&snapshot);

    let counts = install_snapshot(&snapshot, &options.db_path)?;
    info!(
        "Installed snapshot at {} ({} plugins, {} variants)",
        options.db_path.display(),
        counts.plugins,
        counts.variants
    );

    Ok(BuildReport {
        errors,
        counts,
        git_ref: options.git_ref.clone(),
    })
}

/// Write the snapshot to a fresh temp file and atomically rename it into
/// place. Readers holding the previous file keep their inode; new opens see
/// either fully the old or fully the new file.
fn install_snapshot(snapshot: &Snapshot, db_path: &Path) -> Result<plughub_store_db::ImportCounts> {
    let dir = match db_path.parent() {
        Some(parent) if parent != Path::new("") => parent.to_owned(),
        _ => PathBuf::from("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(&dir)
        .io_context(format!("Failed to create temp file in {}", dir.display()))?;

    let counts = {
        let mut db = StoreDb::open(tmp.path(), OpenMode::Create)?;
        db.create_schema()?;
        db.import_snapshot(snapshot)?
        // db drops here, closing the connection before the rename
    };

    tmp.persist(db_path).map_err(|e| BuildFailure::Install {
        path: db_path.to_owned(),
        source: e.error,
    })?;
    Ok(counts)
}

fn log_type_counts(snapshot: &Snapshot) {
    for plugin_type in PluginType::ALL {
        let plugins = snapshot
            .plugins
            .iter()
            .filter(|p| p.plugin_type == plugin_type)
            .count();
        if plugins == 0 {
            continue;
        }
        let prefix = format!("{plugin_type}.");
        let variants = snapshot
            .variants
            .iter()
            .filter(|v| v.plugin_id.starts_with(&prefix))
            .count();
        info!("Processed {variants} variants for {plugins} unique {plugin_type}");
    }
}
