use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::error::{ApiError, ConfigError, Result};
use crate::etag::ResponseCache;

fn default_bind() -> String {
    "[::]:8080".into()
}

fn default_workers() -> usize {
    4
}

fn default_connection_rate() -> usize {
    256
}

fn default_db_path() -> PathBuf {
    PathBuf::from("plugins.db")
}

fn default_enable_compression() -> bool {
    true
}

/// Payloads below this many bytes skip transport compression; the framing
/// overhead is not worth it for small JSON bodies.
fn default_compression_threshold() -> usize {
    1024
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    #[serde(default = "default_bind")]
    pub(crate) bind: String,
    #[serde(default = "default_workers")]
    pub(crate) workers: usize,
    #[serde(default = "default_connection_rate")]
    pub(crate) max_connection_rate: usize,

    #[serde(default = "default_db_path")]
    pub(crate) db_path: PathBuf,

    #[serde(default = "default_enable_compression")]
    pub(crate) enable_compression: bool,
    #[serde(default = "default_compression_threshold")]
    pub(crate) compression_threshold: usize,

    #[serde(skip)]
    pub(crate) catalog: Option<Catalog>,
    #[serde(skip)]
    pub(crate) cache: ResponseCache,
}

impl Config {
    pub(crate) fn load(settings_file: &Path) -> Result<Config> {
        let contents =
            std::fs::read_to_string(settings_file).map_err(|e| ConfigError::ReadFile {
                path: settings_file.display().to_string(),
                source: e,
            })?;
        Config::from_toml(&contents)
    }

    /// Parse a TOML document, applying all defaults. The empty string
    /// yields the default configuration.
    pub(crate) fn from_toml(contents: &str) -> Result<Config> {
        toml::from_str(contents).map_err(|e| ApiError::from(ConfigError::from(e)))
    }

    /// The open catalog. Only `None` before `inner_main` opens it.
    pub(crate) fn catalog(&self) -> Result<&Catalog> {
        self.catalog.as_ref().ok_or(ApiError::Startup {
            reason: "catalog not opened".to_string(),
        })
    }
}

pub(crate) fn load() -> Result<Config> {
    let mut settings = match std::env::var("CONFIG_FILE") {
        Err(_) => {
            if Path::new("settings.toml").exists() {
                Config::load(Path::new("settings.toml"))?
            } else {
                Config::from_toml("")?
            }
        }
        Ok(settings_file) => Config::load(Path::new(&settings_file))?,
    };

    if settings.workers == 0 {
        return Err(ConfigError::Invalid {
            reason: "workers must be greater than 0".to_string(),
        }
        .into());
    }

    if let Some(db_path) = std::env::var_os("DB_PATH") {
        settings.db_path = PathBuf::from(db_path);
    }

    Ok(settings)
}
