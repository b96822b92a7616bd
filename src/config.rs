//! Index settings stored in `.fsindex/config.toml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::planner::DEFAULT_LIMIT;

/// File name of the settings file inside the index directory
pub const CONFIG_TOML: &str = "config.toml";

/// Written on `init` when no settings file exists yet
pub const DEFAULT_CONFIG_TOML: &str = r#"[search]
limit = 100  # maximum rows returned per query

[index]
batch_size = 5000  # rows per insert batch
"#;

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub index: IndexSettings,
}

/// `[search]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum rows a query returns
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// `[index]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Rows handed to the store per insert call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_batch_size() -> usize {
    5000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Load settings from `<index_dir>/config.toml`
///
/// Falls back to defaults if the file or a section is missing.
pub fn load_config(index_dir: &Path) -> Result<Config> {
    let config_path = index_dir.join(CONFIG_TOML);

    if !config_path.exists() {
        log::debug!("No config.toml found, using default settings");
        return Ok(Config::default());
    }

    let config_str = std::fs::read_to_string(&config_path)
        .context("Failed to read config.toml")?;

    let config: Config = toml::from_str(&config_str)
        .context("Failed to parse config.toml")?;

    if config.search.limit == 0 {
        log::warn!("[search] limit = 0 in config.toml; every query will return no rows");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.search.limit, 100);
    }

    #[test]
    fn test_default_file_parses_to_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_TOML), DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(load_config(temp.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_TOML), "[search]\nlimit = 25\n").unwrap();

        let config = load_config(temp.path()).unwrap();
        assert_eq!(config.search.limit, 25);
        assert_eq!(config.index.batch_size, 5000);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_TOML), "[search\nlimit = ").unwrap();
        assert!(load_config(temp.path()).is_err());
    }
}
