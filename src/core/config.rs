//! Connection configuration file
//!
//! The configuration names the survey database and where the cache files
//! go. Authentication is integrated: the file never holds credentials beyond
//! server and database names.
//!
//! ```yaml
//! server: ./data
//! database: Survey_Sample_A19
//! cache_dir: ./cache      # optional, default "."
//! preview_rows: 5         # optional
//! ```
//!
//! Lookup order: an explicit path (`--config` or `SURVEY_PIVOT_CONFIG`),
//! then `survey-pivot.yaml` in the working directory, then the user config
//! directory. Relative paths inside the file are resolved against the
//! directory holding it.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::cache::CacheLocation;
use crate::core::database::ConnectionTarget;
use crate::core::table::DEFAULT_PREVIEW_ROWS;

/// Configuration file name looked up in the working directory
pub const CONFIG_FILE: &str = "survey-pivot.yaml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server holding the database; a directory for the bundled driver
    pub server: String,

    /// Database name
    pub database: String,

    /// Directory of the cache files
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Rows shown in the final preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Directory of the file this was loaded from
    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

/// Errors raised while locating or reading the configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("No configuration file found (looked in: {})", display_paths(.searched))]
    #[diagnostic(
        code(survey_pivot::config::not_found),
        help("create survey-pivot.yaml with `server` and `database` entries, or pass --config")
    )]
    NotFound { searched: Vec<PathBuf> },

    #[error("Cannot read configuration file {path:?}: {source}")]
    #[diagnostic(code(survey_pivot::config::read))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration file {path:?}: {message}")]
    #[diagnostic(code(survey_pivot::config::invalid))]
    Invalid { path: PathBuf, message: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Config {
    /// Locate and load the configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = Self::discover(explicit)?;
        Self::from_path(&path)
    }

    /// Find the configuration file without reading it
    pub fn discover(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => {
                let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
                if let Some(global) = Self::global_config_path() {
                    candidates.push(global);
                }
                candidates
            }
        };

        let found = candidates.iter().find(|p| p.is_file()).cloned();
        found.ok_or(ConfigError::NotFound {
            searched: candidates,
        })
    }

    /// Per-user configuration file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "survey-pivot")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents).map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Config = serde_yml::from_str(contents).map_err(|e| e.to_string())?;
        if config.server.trim().is_empty() {
            return Err("`server` must not be empty".to_string());
        }
        if config.database.trim().is_empty() {
            return Err("`database` must not be empty".to_string());
        }
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn target(&self) -> ConnectionTarget {
        let server = self.resolve(Path::new(&self.server));
        ConnectionTarget::new(server.to_string_lossy(), self.database.clone())
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.cache_dir)
    }

    pub fn cache_location(&self) -> CacheLocation {
        CacheLocation::in_dir(&self.cache_dir())
    }
}
