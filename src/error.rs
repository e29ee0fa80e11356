// src/error.rs

//! Error types for access method operations
//!
//! Errors fall into two classes. Reportable errors (no methods, no
//! selection, lock trouble) are shown to the operator and turn the request
//! into [`Outcome::Fail`](crate::Outcome::Fail). Fatal errors end the
//! process: they mean the terminal conversation with the operator itself
//! broke down, or persisted state could not be written.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no access methods are available")]
    NoMethodsAvailable,

    #[error("no access method is selected/configured")]
    NoMethodSelected,

    #[error("requested operation requires superuser privilege")]
    LockPermission(PathBuf),

    #[error("the access method area is already locked")]
    AlreadyLocked(PathBuf),

    #[error("unable to open/create access method lockfile")]
    LockOpen(PathBuf, #[source] io::Error),

    #[error("unable to lock access method area")]
    Lock(PathBuf, #[source] io::Error),

    #[error("unable to read access methods from {0}")]
    Discovery(PathBuf, #[source] io::Error),

    #[error("error reading acknowledgement of program failure message")]
    Acknowledge(#[source] io::Error),

    #[error("wait for {0} failed")]
    Wait(String, #[source] io::Error),

    #[error("unable to write new option to {0}")]
    Selection(PathBuf, #[source] io::Error),

    #[error("invalid configuration in {0}: {1}")]
    Config(PathBuf, String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether this error must end the process instead of failing one request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Acknowledge(_)
                | Error::Wait(..)
                | Error::Selection(..)
                | Error::Config(..)
                | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reportable_errors_are_not_fatal() {
        let path = PathBuf::from("/var/lib/dpkg/methlock");
        assert!(!Error::NoMethodsAvailable.is_fatal());
        assert!(!Error::NoMethodSelected.is_fatal());
        assert!(!Error::AlreadyLocked(path.clone()).is_fatal());
        assert!(!Error::LockPermission(path).is_fatal());
    }

    #[test]
    fn test_acknowledge_failure_is_fatal() {
        let err = Error::Acknowledge(io::Error::other("tty gone"));
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "error reading acknowledgement of program failure message"
        );
    }

    #[test]
    fn test_operator_messages() {
        assert_eq!(
            Error::AlreadyLocked(PathBuf::from("/x")).to_string(),
            "the access method area is already locked"
        );
        assert_eq!(
            Error::NoMethodSelected.to_string(),
            "no access method is selected/configured"
        );
    }
}
