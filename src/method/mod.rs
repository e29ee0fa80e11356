// src/method/mod.rs

//! Access methods and the option catalog
//!
//! An access method is a directory holding three scripts (`update`,
//! `install`, `setup`) plus a `names` file listing the options it offers.
//! The catalog is the flat list of every (method, option) pair found across
//! the method directories, loaded once per process on first use.

mod parse;
mod selection;

pub use parse::MethodDirectory;
pub use selection::{SelectionStore, StoredSelection};

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scripts every access method provides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodScript {
    /// Refresh the available package list
    Update,
    /// Fetch and install selected packages
    Install,
    /// Query the operator for method parameters
    Setup,
}

impl MethodScript {
    pub const ALL: [MethodScript; 3] = [Self::Update, Self::Install, Self::Setup];

    /// File name of the script inside the method directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Install => "install",
            Self::Setup => "setup",
        }
    }

    /// Label shown to the operator when the script fails
    pub fn label(&self) -> &'static str {
        match self {
            Self::Update => "update available list script",
            Self::Install => "installation script",
            Self::Setup => "query/setup script",
        }
    }
}

impl fmt::Display for MethodScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// One selectable (method, option) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOption {
    /// Method name (the method directory's name)
    pub method: String,
    /// Option name from the method's `names` file
    pub name: String,
    /// Directory holding the method's scripts
    pub method_dir: PathBuf,
    /// Sort key from the `names` file
    pub index: String,
    /// One-line summary from the `names` file
    pub summary: String,
    /// Long description from `desc.<option>`, if present
    pub description: Option<String>,
}

impl MethodOption {
    /// Path of `script` inside this option's method directory
    pub fn script_path(&self, script: MethodScript) -> PathBuf {
        self.method_dir.join(script.file_name())
    }

    /// Whether this entry is the given (method, option) pair
    pub fn matches(&self, method: &str, option: &str) -> bool {
        self.method == method && self.name == option
    }
}

impl fmt::Display for MethodOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.name)
    }
}

/// Discovery of method options in one directory
///
/// Implementations append in discovery order and leave deduplication to
/// themselves; the catalog keeps whatever it is given.
pub trait MethodSource {
    fn discover(&self, dir: &Path, options: &mut Vec<MethodOption>) -> Result<()>;
}

/// Lazily loaded set of available method options
pub struct Catalog {
    source: Box<dyn MethodSource>,
    dirs: Vec<PathBuf>,
    options: Option<Vec<MethodOption>>,
}

impl Catalog {
    /// Create an empty catalog that will scan `dirs` in order
    pub fn new(source: Box<dyn MethodSource>, dirs: Vec<PathBuf>) -> Self {
        Self {
            source,
            dirs,
            options: None,
        }
    }

    /// Populate the catalog if it has never been loaded
    ///
    /// Scans every directory in order. Finding nothing at all is
    /// [`Error::NoMethodsAvailable`] and leaves the catalog unloaded.
    pub fn ensure_loaded(&mut self) -> Result<&[MethodOption]> {
        if self.options.is_none() {
            let mut found = Vec::new();
            for dir in &self.dirs {
                debug!("Scanning {} for access methods", dir.display());
                self.source.discover(dir, &mut found)?;
            }
            if found.is_empty() {
                return Err(Error::NoMethodsAvailable);
            }
            info!("Loaded {} access method option(s)", found.len());
            self.options = Some(found);
        }
        Ok(self.options())
    }

    pub fn is_loaded(&self) -> bool {
        self.options.is_some()
    }

    /// Loaded options; empty until `ensure_loaded` succeeds
    pub fn options(&self) -> &[MethodOption] {
        self.options.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, index: usize) -> Option<&MethodOption> {
        self.options().get(index)
    }

    /// Position of the (method, option) pair, if it is in the catalog
    pub fn position(&self, method: &str, option: &str) -> Option<usize> {
        self.options().iter().position(|o| o.matches(method, option))
    }
}
