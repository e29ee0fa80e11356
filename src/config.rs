// src/config.rs

//! Runtime configuration
//!
//! Defaults match a stock dpkg installation. A TOML file can override any
//! field, and the command line overrides the file.
//!
//! ```toml
//! admin_dir = "/var/lib/dpkg"
//! method_dirs = ["/usr/lib/dpkg/methods", "/usr/local/lib/dpkg/methods"]
//! dpkg = "dpkg"
//! settle_delay_ms = 1000
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default administrative directory
pub const DEFAULT_ADMIN_DIR: &str = "/var/lib/dpkg";

/// System-wide method directory, scanned first
pub const SYSTEM_METHODS_DIR: &str = "/usr/lib/dpkg/methods";

/// Local-override method directory, scanned second
pub const LOCAL_METHODS_DIR: &str = "/usr/local/lib/dpkg/methods";

/// Lock file guarding the access method area, relative to the admin dir
pub const METHOD_LOCK_FILE: &str = "methlock";

/// Persisted method/option selection, relative to the admin dir
pub const CURRENT_OPTION_FILE: &str = "cmethopt";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Administrative directory holding package state and the method lock
    pub admin_dir: PathBuf,
    /// Directories searched for access methods, in priority order
    pub method_dirs: Vec<PathBuf>,
    /// Package tool run by `remove` and `configure`
    pub dpkg: PathBuf,
    /// Pause after a successful subprocess before the UI comes back
    pub settle_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admin_dir: PathBuf::from(DEFAULT_ADMIN_DIR),
            method_dirs: vec![
                PathBuf::from(SYSTEM_METHODS_DIR),
                PathBuf::from(LOCAL_METHODS_DIR),
            ],
            dpkg: PathBuf::from("dpkg"),
            settle_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(path.to_path_buf(), e.to_string()))?;
        toml::from_str(&content).map_err(|e| Error::Config(path.to_path_buf(), e.to_string()))
    }

    /// Path of the access method lock file
    pub fn lock_path(&self) -> PathBuf {
        self.admin_dir.join(METHOD_LOCK_FILE)
    }

    /// Path of the persisted method/option selection
    pub fn current_option_path(&self) -> PathBuf {
        self.admin_dir.join(CURRENT_OPTION_FILE)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
