// src/method/selection.rs

//! Persisted method/option selection
//!
//! The current choice is a single `<method> <option>` line in the
//! administrative directory. It is re-resolved against the freshly loaded
//! catalog on every request; a stored pair the catalog no longer offers
//! counts as no selection at all.

use super::{Catalog, MethodOption};
use crate::error::{Error, Result};
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Mode of the persisted selection; readable by unprivileged listings
const SELECTION_MODE: u32 = 0o644;

/// Method/option pair as read from disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSelection {
    pub method: String,
    pub option: String,
}

impl StoredSelection {
    fn parse(content: &str) -> Option<Self> {
        let mut words = content.split_whitespace();
        let method = words.next()?;
        let option = words.next()?;
        if words.next().is_some() {
            return None;
        }
        Some(Self {
            method: method.to_string(),
            option: option.to_string(),
        })
    }
}

/// File-backed current selection
#[derive(Debug, Clone)]
pub struct SelectionStore {
    path: PathBuf,
}

impl SelectionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored pair; a missing or malformed file means none
    pub fn load(&self) -> Option<StoredSelection> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Unable to read {}: {}", self.path.display(), e);
                return None;
            }
        };

        let selection = StoredSelection::parse(&content);
        if selection.is_none() {
            warn!("Ignoring malformed selection in {}", self.path.display());
        }
        selection
    }

    /// Catalog index of the stored selection, if it is still offered
    pub fn resolve(&self, catalog: &Catalog) -> Option<usize> {
        let stored = self.load()?;
        let index = catalog.position(&stored.method, &stored.option);
        if index.is_none() {
            info!(
                "Selected method {} option {} is no longer available",
                stored.method, stored.option
            );
        }
        index
    }

    /// Atomically replace the stored selection
    pub fn save(&self, option: &MethodOption) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let wrap = |e: io::Error| Error::Selection(self.path.clone(), e);

        let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
        writeln!(tmp, "{} {}", option.method, option.name).map_err(wrap)?;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(SELECTION_MODE))
            .map_err(wrap)?;
        tmp.as_file().sync_all().map_err(wrap)?;
        tmp.persist(&self.path).map_err(|e| wrap(e.error))?;

        debug!("Saved selection {} to {}", option, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::tests::option;
    use crate::method::MethodSource;
    use tempfile::TempDir;

    struct ListSource(Vec<MethodOption>);

    impl MethodSource for ListSource {
        fn discover(&self, _dir: &Path, options: &mut Vec<MethodOption>) -> Result<()> {
            options.extend(self.0.iter().cloned());
            Ok(())
        }
    }

    fn loaded_catalog(options: Vec<MethodOption>) -> Catalog {
        let mut catalog = Catalog::new(Box::new(ListSource(options)), vec![PathBuf::from("/m")]);
        catalog.ensure_loaded().unwrap();
        catalog
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            StoredSelection::parse("apt apt\n"),
            Some(StoredSelection {
                method: "apt".to_string(),
                option: "apt".to_string()
            })
        );
        assert_eq!(StoredSelection::parse("onlymethod\n"), None);
        assert_eq!(StoredSelection::parse("a b c\n"), None);
        assert_eq!(StoredSelection::parse(""), None);
    }

    #[test]
    fn test_save_then_resolve() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path().join("cmethopt"));
        let catalog = loaded_catalog(vec![option("ftp", "mirror"), option("cdrom", "disc")]);

        assert_eq!(store.resolve(&catalog), None);

        store.save(catalog.get(1).unwrap()).unwrap();
        assert_eq!(
            fs::read_to_string(store.path()).unwrap(),
            "cdrom disc\n"
        );
        assert_eq!(store.resolve(&catalog), Some(1));
    }

    #[test]
    fn test_saved_selection_is_world_readable() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path().join("cmethopt"));

        store.save(&option("ftp", "mirror")).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_stale_selection_resolves_to_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path().join("cmethopt"));
        fs::write(store.path(), "floppy disk\n").unwrap();

        let catalog = loaded_catalog(vec![option("ftp", "mirror")]);
        assert!(store.load().is_some());
        assert_eq!(store.resolve(&catalog), None);
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = SelectionStore::new(temp_dir.path().join("gone/cmethopt"));

        let result = store.save(&option("ftp", "mirror"));
        assert!(matches!(result, Err(Error::Selection(..))));
    }
}
