// src/main.rs

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use methodctl::{Config, Coordinator, Outcome};
use std::io;
use std::process::ExitCode;
use tracing::debug;

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(admindir) = &cli.admindir {
        config.admin_dir = admindir.clone();
    }
    if let Some(dpkg) = &cli.dpkg {
        config.dpkg = dpkg.clone();
    }
    Ok(config)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = load_config(&cli)?;
    debug!("Using administrative directory {}", config.admin_dir.display());

    let mut coordinator = Coordinator::with_stdio(config);
    let outcome = match cli.command {
        Commands::Update => coordinator.update(),
        Commands::Install => coordinator.install(),
        Commands::Remove => coordinator.remove(),
        Commands::Configure => coordinator.configure(),
        Commands::Setup => coordinator.setup(),
        Commands::List => coordinator.list(&mut io::stdout()),
    }
    .context("methodctl: fatal error")?;

    Ok(match outcome {
        Outcome::Normal => ExitCode::SUCCESS,
        Outcome::Fail => ExitCode::FAILURE,
    })
}
