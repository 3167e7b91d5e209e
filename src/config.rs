//! Configuration file support for promptvc
//!
//! Reads from .promptvc/config.toml

use log::warn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::color::{BranchColor, DEFAULT_PALETTE};
use crate::record::DEFAULT_BRANCH;

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct Config {
    /// Branch settings
    #[serde(default)]
    pub branch: BranchConfig,

    /// Tree and diff rendering
    #[serde(default)]
    pub display: DisplayConfig,

    /// Fallbacks for omitted CLI flags
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Branch-related configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BranchConfig {
    /// Branch new commits land on when none is given
    /// Default: "main"
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Branch colors in rank order; empty means the built-in palette
    #[serde(default = "default_palette")]
    pub palette: Vec<BranchColor>,

    /// Column width of each side in `diff` output
    /// Default: 60
    #[serde(default = "default_diff_width")]
    pub diff_width: usize,
}

fn default_palette() -> Vec<BranchColor> {
    DEFAULT_PALETTE.to_vec()
}

fn default_diff_width() -> usize {
    60
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            diff_width: default_diff_width(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct DefaultsConfig {
    /// Config group used when `--group` is omitted
    #[serde(default)]
    pub group: Option<String>,
}

impl Config {
    /// Load config from .promptvc/config.toml
    /// Returns default config if file doesn't exist or can't be parsed
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_path() {
            if let Ok(contents) = std::fs::read_to_string(&path) {
                match toml::from_str(&contents) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".promptvc").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    /// Explicit group, else the configured default
    pub fn resolve_group(&self, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.defaults.group.clone())
    }
}
