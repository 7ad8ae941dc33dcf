//! Document loader: walks the catalog source tree.
//!
//! Layout: `<root>/<plugin_type>/<plugin_name>/` with one base `plugin.yml`
//! plus one document per variant (the file stem is the variant name), and an
//! optional `<root>/maintainers.yml` with maintainer profiles.
//!
//! The walk is one-pass and finite. Directory listings are sorted so the
//! document order — and with it everything downstream — is reproducible.
//! Malformed YAML yields an `Err` item tagged with the offending path and
//! the walk continues; a missing plugin-type directory yields nothing.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use plughub_store_db::PluginType;
use tracing::debug;

use crate::document::{MaintainersDoc, PluginDoc, VariantDoc};
use crate::error::{IoErrorContext, Result};
use crate::report::BuildError;

/// Base document file name inside each plugin directory.
pub const BASE_DOCUMENT: &str = "plugin.yml";

/// One successfully parsed document, with provenance.
#[derive(Debug)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub plugin_type: PluginType,
    pub plugin: String,
    pub kind: DocumentKind,
}

#[derive(Debug)]
pub enum DocumentKind {
    Base(PluginDoc),
    Variant { name: String, doc: VariantDoc },
}

enum Pending {
    Base {
        plugin_type: PluginType,
        plugin: String,
        path: PathBuf,
    },
    Variant {
        plugin_type: PluginType,
        plugin: String,
        name: String,
        path: PathBuf,
    },
    /// A plugin directory with variant files but no base document.
    MissingBase {
        plugin_type: PluginType,
        plugin: String,
        dir: PathBuf,
    },
}

/// One-pass iterator over the catalog source tree.
///
/// Items are `Ok(LoadedDocument)` or `Err(BuildError)`; the caller collects
/// the errors and keeps consuming. Parsing happens lazily, per item.
pub struct Walker {
    queue: VecDeque<Pending>,
}

impl Walker {
    /// Scan the source tree and queue every document for parsing.
    ///
    /// Only an unreadable root is fatal here; everything below it degrades
    /// to per-document errors.
    pub fn new(root: &Path) -> Result<Self> {
        let mut queue = VecDeque::new();
        for plugin_type in PluginType::ALL {
            let type_dir = root.join(plugin_type.as_str());
            if !type_dir.is_dir() {
                debug!("No {plugin_type} directory, skipping");
                continue;
            }
            for plugin_dir in sorted_entries(&type_dir)? {
                if !plugin_dir.is_dir() {
                    continue;
                }
                let Some(plugin) = file_name(&plugin_dir) else {
                    continue;
                };
                queue_plugin_dir(&mut queue, plugin_type, &plugin, &plugin_dir)?;
            }
        }
        Ok(Walker { queue })
    }
}

fn queue_plugin_dir(
    queue: &mut VecDeque<Pending>,
    plugin_type: PluginType,
    plugin: &str,
    dir: &Path,
) -> Result<()> {
    let mut base = None;
    let mut variants = Vec::new();
    for path in sorted_entries(dir)? {
        let Some(name) = file_name(&path) else {
            continue;
        };
        if name.starts_with('.') || !path.is_file() {
            continue;
        }
        let Some(stem) = yaml_stem(&name) else {
            continue;
        };
        if name == BASE_DOCUMENT {
            base = Some(path);
        } else {
            variants.push((stem, path));
        }
    }

    match base {
        Some(path) => queue.push_back(Pending::Base {
            plugin_type,
            plugin: plugin.to_owned(),
            path,
        }),
        // An empty directory declares nothing; variant files without a base
        // document are a data problem worth one error.
        None if variants.is_empty() => return Ok(()),
        None => {
            queue.push_back(Pending::MissingBase {
                plugin_type,
                plugin: plugin.to_owned(),
                dir: dir.to_owned(),
            });
            return Ok(());
        }
    }

    for (name, path) in variants {
        queue.push_back(Pending::Variant {
            plugin_type,
            plugin: plugin.to_owned(),
            name,
            path,
        });
    }
    Ok(())
}

impl Iterator for Walker {
    type Item = std::result::Result<LoadedDocument, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        let pending = self.queue.pop_front()?;
        Some(match pending {
            Pending::Base {
                plugin_type,
                plugin,
                path,
            } => match parse_document::<PluginDoc>(&path) {
                Ok(doc) => Ok(LoadedDocument {
                    path,
                    plugin_type,
                    plugin,
                    kind: DocumentKind::Base(doc),
                }),
                Err(message) => Err(BuildError::for_plugin(&path, plugin_type, &plugin, message)),
            },
            Pending::Variant {
                plugin_type,
                plugin,
                name,
                path,
            } => match parse_document::<VariantDoc>(&path) {
                Ok(doc) => Ok(LoadedDocument {
                    path,
                    plugin_type,
                    plugin,
                    kind: DocumentKind::Variant { name, doc },
                }),
                Err(message) => Err(BuildError::for_variant(
                    &path,
                    plugin_type,
                    &plugin,
                    &name,
                    message,
                )),
            },
            Pending::MissingBase {
                plugin_type,
                plugin,
                dir,
            } => Err(BuildError::for_plugin(
                &dir,
                plugin_type,
                &plugin,
                format!("plugin directory has variant documents but no {BASE_DOCUMENT}"),
            )),
        })
    }
}

/// Load the optional root maintainer profile document.
///
/// A missing file is fine; a malformed one is a per-document error and the
/// build continues without profiles.
pub fn load_maintainer_profiles(root: &Path) -> std::result::Result<MaintainersDoc, BuildError> {
    let path = root.join("maintainers.yml");
    if !path.is_file() {
        return Ok(MaintainersDoc::new());
    }
    parse_document(&path).map_err(|message| BuildError::parse(&path, message))
}

fn parse_document<T: serde::de::DeserializeOwned>(path: &Path) -> std::result::Result<T, String> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read document: {e}"))?;
    serde_yaml_ng::from_str(&contents).map_err(|e| format!("failed to parse YAML: {e}"))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in
        std::fs::read_dir(dir).io_context(format!("Failed to list directory {}", dir.display()))?
    {
        let entry = entry.io_context(format!("Failed to list directory {}", dir.display()))?;
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn yaml_stem(name: &str) -> Option<String> {
    name.strip_suffix(".yml")
        .or_else(|| name.strip_suffix(".yaml"))
        .map(str::to_owned)
}
