// src/lib.rs

//! Access method control for dpkg front ends
//!
//! Runs pluggable access method scripts and the package tool on behalf of
//! an interactive operator, one child at a time, with failures described
//! and acknowledged before control returns.
//!
//! # Architecture
//!
//! - Method lock: non-blocking exclusive lock on `<admindir>/methlock`,
//!   held across update/install/setup and released on every exit path
//! - Catalog: method options discovered once per process from the system
//!   and local method directories
//! - Selection: the chosen method/option pair persisted in
//!   `<admindir>/cmethopt`, re-resolved on every request
//! - Subprocess runner: suspends the UI, shields this process from
//!   interrupts while the child runs, classifies the wait status
//! - Coordinator: the five request operations composed from the above

pub mod config;
mod error;
pub mod interface;
pub mod lock;
pub mod method;
pub mod request;
pub mod subprocess;

pub use config::Config;
pub use error::{Error, Result};
pub use interface::{ConsoleInterface, Interface, QuitAction};
pub use lock::{MethodLock, MethodLockGuard};
pub use method::{Catalog, MethodDirectory, MethodOption, MethodScript, MethodSource, SelectionStore};
pub use request::{Coordinator, PendingAction};
pub use subprocess::{Command, Outcome, SubprocessRunner, Termination};
