//! Configuration file handling.
//!
//! Loads `.dbmapper.json`, which selects the database the `query` command
//! runs against and the mapper policies both commands apply:
//!
//! ```json
//! {
//!   "database": { "type": "sqlite", "path": "./cozo.sqlite" },
//!   "mapper": { "placeholder": "dollar", "empty_result": "error" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use dbmapper::MapperConfig;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".dbmapper.json";

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfigFile,
    /// Placeholder and empty-result policies
    #[serde(default)]
    pub mapper: MapperConfig,
}

/// Database configuration variants for different backends.
///
/// JSON format uses a "type" field with lowercase variant names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfigFile {
    /// CozoDB with SQLite storage
    Sqlite { path: PathBuf },
    /// In-memory CozoDB
    #[default]
    #[serde(rename = "memory")]
    Mem,
    /// PostgreSQL server
    Postgres { connection_string: String },
}

impl ConfigFile {
    /// Resolve configuration for this run.
    ///
    /// An explicit path must exist. Without one, `.dbmapper.json` in the
    /// current directory is used when present, and defaults otherwise.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Self::load(&local);
        }
        tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
        Ok(Self::default())
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let config: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))?;
        tracing::debug!(path = %path.display(), database = ?config.database, "loaded configuration");
        Ok(config)
    }
}
