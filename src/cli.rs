// src/cli.rs
//! CLI definitions for methodctl
//!
//! Each request operation is a subcommand:
//! - `update` - Run the selected method's update script
//! - `install` - Run the selected method's install script
//! - `remove` - Remove packages marked for removal (`dpkg --pending --remove`)
//! - `configure` - Configure unpacked packages (`dpkg --pending --configure`)
//! - `setup` - Choose an access method and run its setup script
//! - `list` - Show available access methods

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "methodctl")]
#[command(author, version)]
#[command(about = "Run dpkg access methods under the method lock", long_about = None)]
pub struct Cli {
    /// Administrative directory (default: /var/lib/dpkg)
    #[arg(long, global = true, env = "DPKG_ADMINDIR", value_name = "DIR")]
    pub admindir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Package tool to run for remove/configure (default: dpkg)
    #[arg(long, global = true, value_name = "PATH")]
    pub dpkg: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Update the list of available packages
    Update,
    /// Install and upgrade wanted packages
    Install,
    /// Remove packages marked for removal
    Remove,
    /// Configure packages that are unpacked but not configured
    #[command(alias = "config")]
    Configure,
    /// Choose the access method to use
    Setup,
    /// List available access methods
    List,
}
