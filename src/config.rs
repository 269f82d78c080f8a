//! Configuration management
//!
//! Loads `config.toml` from the user config directory (or an explicit path),
//! falling back to defaults for anything missing. CLI flags are applied on top.

use crate::builder::BuildOptions;
use crate::recovery::RECOVERY_FILE_NAME;
use crate::scanner::SkipRules;
use crate::size::DEFAULT_BLOCK_SIZE;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bytes per hash read and per progress unit
    pub block_size: u64,

    /// Seconds between recovery file commits
    pub commit_interval_secs: u64,

    /// Root-level names to skip (compared case-insensitively)
    pub files_to_skip: Vec<String>,

    /// Compare the two newest snapshots instead of hashing the tree
    pub skip_sha_check: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Wait for Enter before exiting
    pub wait_for_enter: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            commit_interval_secs: 20,
            files_to_skip: vec![".tisk".to_string(), RECOVERY_FILE_NAME.to_string()],
            skip_sha_check: false,
        }
    }
}

impl Config {
    /// Load from the default location, using defaults if the file is missing
    /// or cannot be parsed
    pub fn load() -> Self {
        match config_file_path() {
            Some(path) if path.is_file() => match Self::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: ignoring config {}: {:#}", path.display(), e);
                    Self::default()
                }
            },
            _ => Self::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Write this configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Override config values with the ones given on the command line
    pub fn apply_cli_overrides(
        &mut self,
        block_size: Option<u64>,
        commit_interval_secs: Option<u64>,
        extra_skips: &[String],
        skip_sha_check: bool,
        wait_for_enter: bool,
    ) {
        if let Some(block_size) = block_size {
            self.scan.block_size = block_size;
        }
        if let Some(secs) = commit_interval_secs {
            self.scan.commit_interval_secs = secs;
        }
        self.scan.files_to_skip.extend(extra_skips.iter().cloned());
        self.scan.skip_sha_check |= skip_sha_check;
        self.ui.wait_for_enter |= wait_for_enter;
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.block_size == 0 {
            bail!("block_size must be greater than zero");
        }
        Ok(())
    }

    /// Settings for the snapshot builder.
    ///
    /// The recovery file is always skipped, whatever `files_to_skip` says.
    pub fn build_options(&self) -> BuildOptions {
        let mut names = self.scan.files_to_skip.clone();
        names.push(RECOVERY_FILE_NAME.to_string());

        BuildOptions {
            block_size: self.scan.block_size,
            commit_interval: Duration::from_secs(self.scan.commit_interval_secs),
            skip_rules: SkipRules::new(names),
            recovery_file_name: RECOVERY_FILE_NAME.to_string(),
        }
    }
}

/// `<config dir>/sha256report/config.toml`, if a home directory is known
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sha256report")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.scan.block_size, 65536);
        assert_eq!(config.scan.commit_interval_secs, 20);
        assert_eq!(config.scan.files_to_skip, vec![".tisk", "sha256report.tmp"]);
        assert!(!config.scan.skip_sha_check);
        assert!(!config.ui.wait_for_enter);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[scan]\nblock_size = 4096\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.scan.block_size, 4096);
        assert_eq!(config.scan.commit_interval_secs, 20);
        assert_eq!(config.ui, UiConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.scan.skip_sha_check = true;
        config.scan.files_to_skip.push("Thumbs.db".to_string());
        config.save(&path).unwrap();

        assert_eq!(Config::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[scan\nblock_size = ").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        config.apply_cli_overrides(Some(1024), None, &["cache".to_string()], true, false);

        assert_eq!(config.scan.block_size, 1024);
        assert_eq!(config.scan.commit_interval_secs, 20);
        assert!(config.scan.files_to_skip.contains(&"cache".to_string()));
        assert!(config.scan.skip_sha_check);
        assert!(!config.ui.wait_for_enter);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let mut config = Config::default();
        config.scan.block_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_options_always_skip_recovery_file() {
        let mut config = Config::default();
        config.scan.files_to_skip.clear();
        config.scan.commit_interval_secs = 5;

        let options = config.build_options();
        assert!(options.skip_rules.skips("sha256report.tmp", true));
        assert!(!options.skip_rules.skips(".tisk", false));
        assert_eq!(options.commit_interval, Duration::from_secs(5));
    }
}
