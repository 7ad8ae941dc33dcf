//! Non-fatal build problems and the run report.

use std::fmt;
use std::path::{Path, PathBuf};

use plughub_store_db::{ImportCounts, PluginType};

/// A problem with one source document. Collected as data during the run;
/// never raised across the loader/normalizer boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    /// Path of the offending document.
    pub path: PathBuf,
    pub plugin_type: Option<PluginType>,
    pub plugin: Option<String>,
    pub variant: Option<String>,
    pub message: String,
}

impl BuildError {
    /// A document-level problem with no plugin context yet.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildError {
            path: path.into(),
            plugin_type: None,
            plugin: None,
            variant: None,
            message: message.into(),
        }
    }

    pub fn for_plugin(
        path: impl Into<PathBuf>,
        plugin_type: PluginType,
        plugin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BuildError {
            path: path.into(),
            plugin_type: Some(plugin_type),
            plugin: Some(plugin.into()),
            variant: None,
            message: message.into(),
        }
    }

    pub fn for_variant(
        path: impl Into<PathBuf>,
        plugin_type: PluginType,
        plugin: impl Into<String>,
        variant: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BuildError {
            path: path.into(),
            plugin_type: Some(plugin_type),
            plugin: Some(plugin.into()),
            variant: Some(variant.into()),
            message: message.into(),
        }
    }

    /// `extractors/tap-csv/acme`-style location for the report table.
    pub fn location(&self) -> String {
        let mut parts = Vec::new();
        if let Some(t) = self.plugin_type {
            parts.push(t.as_str().to_owned());
        }
        if let Some(p) = &self.plugin {
            parts.push(p.clone());
        }
        if let Some(v) = &self.variant {
            parts.push(v.clone());
        }
        if parts.is_empty() {
            self.path.display().to_string()
        } else {
            parts.join("/")
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Outcome of one build run. The run as a whole succeeded; the collected
/// errors describe documents that were excluded from the snapshot.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub errors: Vec<BuildError>,
    pub counts: ImportCounts,
    pub git_ref: Option<String>,
}

impl BuildReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the collected errors as a markdown table for CI and operator
    /// tooling.
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Build Errors\n\n");
        if self.errors.is_empty() {
            out.push_str("None.\n");
            return out;
        }
        out.push_str("| Location | Error | Source |\n");
        out.push_str("|----------|-------|--------|\n");
        for error in &self.errors {
            let source = match &self.git_ref {
                Some(git_ref) => format!("{} @ {git_ref}", display_path(&error.path)),
                None => display_path(&error.path),
            };
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                error.location(),
                error.message,
                source,
            ));
        }
        out
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
