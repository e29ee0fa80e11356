// src/lock.rs

//! Exclusive lock on the access method area
//!
//! Every request that reads or changes method configuration (update,
//! install, setup) holds this lock from just before it resolves the current
//! selection until its subprocess has finished. The lock file lives in the
//! administrative directory and is never removed.
//!
//! # Lock Strategy
//!
//! - The file is opened lazily on the first `acquire` and kept open for the
//!   life of the [`MethodLock`]; later acquisitions re-lock the same handle.
//! - Acquisition never blocks. A held lock is reported as
//!   [`Error::AlreadyLocked`] so the operator can retry.
//! - [`MethodLockGuard`] unlocks when dropped, so an early return still
//!   releases the area.
//!
//! # Example
//!
//! ```ignore
//! use methodctl::lock::MethodLock;
//!
//! let mut lock = MethodLock::new("/var/lib/dpkg/methlock");
//! let guard = lock.acquire()?;
//! // ... run the method script ...
//! guard.release()?;
//! ```

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Lazily opened lock file for the access method area
#[derive(Debug)]
pub struct MethodLock {
    path: PathBuf,
    file: Option<File>,
}

impl MethodLock {
    /// Create a lock bound to `path`; nothing is opened until `acquire`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
        }
    }

    /// Try to take the exclusive lock without blocking
    ///
    /// Returns a guard that releases the lock when dropped. Fails with
    /// [`Error::LockPermission`] when the file cannot be opened for lack of
    /// privilege (no lock attempt is made), [`Error::AlreadyLocked`] when
    /// another holder owns it, and [`Error::LockOpen`] / [`Error::Lock`] for
    /// anything else.
    pub fn acquire(&mut self) -> Result<MethodLockGuard<'_>> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_lock_file(&self.path)?,
        };
        let file = self.file.insert(file);

        match file.try_lock_exclusive() {
            Ok(()) => {
                log::debug!("Acquired access method lock at {:?}", self.path);
                Ok(MethodLockGuard {
                    file,
                    path: &self.path,
                    released: false,
                })
            }
            Err(e) if is_contended(&e) => {
                log::info!("Access method lock already held at {:?}", self.path);
                Err(Error::AlreadyLocked(self.path.clone()))
            }
            Err(e) => Err(Error::Lock(self.path.clone(), e)),
        }
    }

    /// Check whether any holder currently owns the lock at `path`
    ///
    /// Opens a separate handle, so it also sees a lock held by this process.
    pub fn is_held<P: AsRef<Path>>(path: P) -> bool {
        let file = match File::open(path.as_ref()) {
            Ok(f) => f,
            Err(_) => return false,
        };

        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                false
            }
            Err(_) => true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file has been opened yet
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o660)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => Error::LockPermission(path.to_path_buf()),
            _ => Error::LockOpen(path.to_path_buf(), e),
        })
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Held access method lock
///
/// Dropping the guard unlocks the file. Use [`release`](Self::release) on
/// the normal path to learn whether unlocking worked.
#[must_use = "the access method area is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct MethodLockGuard<'a> {
    file: &'a File,
    path: &'a Path,
    released: bool,
}

impl MethodLockGuard<'_> {
    /// Unlock the access method area, keeping the file open for reuse
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        FileExt::unlock(self.file).map_err(|e| Error::Lock(self.path.to_path_buf(), e))?;
        log::debug!("Released access method lock at {:?}", self.path);
        Ok(())
    }
}

impl Drop for MethodLockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match FileExt::unlock(self.file) {
            Ok(()) => log::debug!("Released access method lock at {:?}", self.path),
            Err(e) => log::warn!("unable to unlock access method area {:?}: {}", self.path, e),
        }
    }
}
