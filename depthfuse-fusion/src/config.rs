//! Hierarchical key/value configuration.
//!
//! Configuration resources are TOML files. Keys are addressed with dotted
//! paths (`integrate_depth_maps.type`), and blocks can be merged so that a
//! host application's settings override what ships in a resource file.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::{Table, Value};
use tracing::debug;

/// Environment variable listing extra configuration directories.
pub const CONFIG_PATH_ENV: &str = "DEPTHFUSE_CONFIG_PATH";

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration resource '{name}' not found (searched {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing configuration key '{0}'")]
    MissingKey(String),

    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("unknown algorithm '{name}' for '{block}' (available: {available:?})")]
    UnknownAlgorithm {
        block: String,
        name: String,
        available: Vec<String>,
    },
}

/// A block of configuration values backed by a TOML table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigBlock {
    table: Table,
}

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: Table) -> Self {
        Self { table }
    }

    /// Parse a TOML document.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        Ok(Self {
            table: text.parse::<Table>()?,
        })
    }

    /// Load a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn as_table(&self) -> &Table {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Look up a dotted key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.table.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// Typed lookup of a required key.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.message().to_string(),
            })
    }

    /// Typed lookup falling back to `default` when the key is absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        if self.has(key) {
            self.get(key)
        } else {
            Ok(default)
        }
    }

    /// Set a dotted key, creating intermediate tables as needed.
    ///
    /// A non-table value sitting on the path is replaced by a table.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let mut parts: Vec<&str> = key.split('.').collect();
        let Some(last) = parts.pop() else {
            return;
        };
        let mut table = &mut self.table;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert(Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(next) = entry else {
                unreachable!("entry was just made a table");
            };
            table = next;
        }
        table.insert(last.to_string(), value.into());
    }

    /// The table under `key`, or an empty block if absent or not a table.
    pub fn subblock(&self, key: &str) -> ConfigBlock {
        self.value(key)
            .and_then(Value::as_table)
            .cloned()
            .map(Self::from_table)
            .unwrap_or_default()
    }

    /// Merge `other` into this block. Tables merge recursively; for any
    /// other conflicting key the value from `other` wins.
    pub fn merge(&mut self, other: &ConfigBlock) {
        merge_tables(&mut self.table, &other.table);
    }
}

fn merge_tables(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Table(base_child)), Value::Table(overlay_child)) => {
                merge_tables(base_child, overlay_child);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Finds named configuration resources in an ordered list of directories.
#[derive(Debug, Clone, Default)]
pub struct ConfigLocator {
    dirs: Vec<PathBuf>,
}

impl ConfigLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the search path from [`CONFIG_PATH_ENV`].
    pub fn from_env() -> Self {
        let dirs = std::env::var_os(CONFIG_PATH_ENV)
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        Self { dirs }
    }

    /// Append a directory to search after the existing ones.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Path of the first directory holding `name`.
    pub fn find(&self, name: &str) -> Result<PathBuf, ConfigError> {
        self.dirs
            .iter()
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ConfigError::NotFound {
                name: name.to_string(),
                searched: self.dirs.clone(),
            })
    }

    /// Locate and load `name`.
    pub fn read(&self, name: &str) -> Result<ConfigBlock, ConfigError> {
        let path = self.find(name)?;
        debug!("Reading configuration from {}", path.display());
        ConfigBlock::load(&path)
    }
}
