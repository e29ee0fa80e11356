// src/request.rs

//! The five request operations
//!
//! | Operation   | Catalog | Method lock | Runs                              |
//! |-------------|---------|-------------|-----------------------------------|
//! | `update`    | yes     | yes         | `<method>/update`                 |
//! | `install`   | yes     | yes         | `<method>/install`                |
//! | `setup`     | yes     | yes         | `<method>/setup` after the menu   |
//! | `remove`    | no      | no          | `dpkg --pending --remove`         |
//! | `configure` | no      | no          | `dpkg --pending --configure`      |
//!
//! Reportable errors are shown to the operator and become
//! [`Outcome::Fail`]; an `Err` from any operation is fatal to the process.
//! The method lock is released on every path out of an operation.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::interface::{ConsoleInterface, Interface, QuitAction};
use crate::lock::MethodLock;
use crate::method::{Catalog, MethodDirectory, MethodOption, MethodScript, MethodSource, SelectionStore};
use crate::subprocess::{Command, Outcome, SubprocessRunner};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Name shown in operator-facing failure messages
pub const PROGRAM_NAME: &str = "methodctl";

const UNLOCK_FAILURE: &str = "unable to unlock access method area";

/// Pending-package action delegated to the package tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Remove,
    Configure,
}

impl PendingAction {
    pub fn flag(&self) -> &'static str {
        match self {
            Self::Remove => "--remove",
            Self::Configure => "--configure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Remove => "dpkg --remove",
            Self::Configure => "dpkg --configure",
        }
    }
}

/// Command running `script` of the selected method
///
/// argv is `(script, admin_dir, method, option)`.
pub fn method_command(option: &MethodOption, script: MethodScript, admin_dir: &Path) -> Command {
    Command::new(option.script_path(script), script.label())
        .arg(script.file_name())
        .arg(admin_dir)
        .arg(&option.method)
        .arg(&option.name)
}

/// Command asking the package tool to process pending packages
pub fn pending_command(dpkg: &Path, admin_dir: &Path, action: PendingAction) -> Command {
    Command::new(dpkg, action.label())
        .arg(dpkg)
        .arg("--admindir")
        .arg(admin_dir)
        .arg("--pending")
        .arg(action.flag())
}

/// Owns all per-process state the request operations share
///
/// Built once at startup. The catalog is loaded and the lock file opened
/// on first use, then reused by every later request.
pub struct Coordinator {
    config: Config,
    lock: MethodLock,
    catalog: Catalog,
    selection: SelectionStore,
    runner: SubprocessRunner,
    interface: Box<dyn Interface>,
}

impl Coordinator {
    pub fn new(
        config: Config,
        source: Box<dyn MethodSource>,
        runner: SubprocessRunner,
        interface: Box<dyn Interface>,
    ) -> Self {
        Self {
            lock: MethodLock::new(config.lock_path()),
            catalog: Catalog::new(source, config.method_dirs.clone()),
            selection: SelectionStore::new(config.current_option_path()),
            runner,
            interface,
            config,
        }
    }

    /// Coordinator wired to the filesystem and the controlling terminal
    pub fn with_stdio(config: Config) -> Self {
        let runner = SubprocessRunner::stdio(config.settle_delay());
        Self::new(
            config,
            Box::new(MethodDirectory),
            runner,
            Box::new(ConsoleInterface::stdio(PROGRAM_NAME)),
        )
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// Run the selected method's update script
    pub fn update(&mut self) -> Result<Outcome> {
        self.run_method_script(MethodScript::Update)
    }

    /// Run the selected method's install script
    pub fn install(&mut self) -> Result<Outcome> {
        self.run_method_script(MethodScript::Install)
    }

    /// Remove packages marked for removal
    pub fn remove(&mut self) -> Result<Outcome> {
        self.run_pending(PendingAction::Remove)
    }

    /// Configure unpacked packages
    pub fn configure(&mut self) -> Result<Outcome> {
        self.run_pending(PendingAction::Configure)
    }

    /// Let the operator choose a method, run its setup script, and save
    /// the choice if the script succeeds
    pub fn setup(&mut self) -> Result<Outcome> {
        let Self {
            config,
            lock,
            catalog,
            selection,
            runner,
            interface,
        } = self;
        let interface = &mut **interface;

        if let Err(e) = catalog.ensure_loaded() {
            return report(interface, e);
        }

        with_method_lock(lock, interface, |interface| {
            let current = selection.resolve(catalog);
            let index = match interface.choose_option(catalog, current)? {
                QuitAction::Save(index) => index,
                QuitAction::Abandon => {
                    info!("Method selection abandoned");
                    return Ok(Outcome::Fail);
                }
            };
            let Some(option) = catalog.get(index) else {
                return report(interface, Error::NoMethodSelected);
            };

            let command = method_command(option, MethodScript::Setup, &config.admin_dir);
            let outcome = runner.run(&command, interface)?;
            if outcome.is_normal() {
                selection.save(option)?;
                info!("Selected access method {}", option);
            }
            Ok(outcome)
        })
    }

    /// Write every available method option, marking the current selection
    pub fn list(&mut self, out: &mut dyn Write) -> Result<Outcome> {
        if let Err(e) = self.catalog.ensure_loaded() {
            return report(&mut *self.interface, e);
        }

        let current = self.selection.resolve(&self.catalog);
        for (i, option) in self.catalog.options().iter().enumerate() {
            let mark = if Some(i) == current { '*' } else { ' ' };
            writeln!(
                out,
                "{} {:<12} {:<12} {}",
                mark, option.method, option.name, option.summary
            )?;
        }
        Ok(Outcome::Normal)
    }

    fn run_method_script(&mut self, script: MethodScript) -> Result<Outcome> {
        let Self {
            config,
            lock,
            catalog,
            selection,
            runner,
            interface,
        } = self;
        let interface = &mut **interface;

        if let Err(e) = catalog.ensure_loaded() {
            return report(interface, e);
        }

        with_method_lock(lock, interface, |interface| {
            let Some(option) = selection.resolve(catalog).and_then(|i| catalog.get(i)) else {
                return report(interface, Error::NoMethodSelected);
            };

            let command = method_command(option, script, &config.admin_dir);
            runner.run(&command, interface)
        })
    }

    fn run_pending(&mut self, action: PendingAction) -> Result<Outcome> {
        let command = pending_command(&self.config.dpkg, &self.config.admin_dir, action);

        // The announcement must land on the suspended screen; `run` suspends again
        self.interface.suspend();
        self.interface
            .announce(&format!("running dpkg --pending {} ...", action.flag()))?;
        self.runner.run(&command, &mut *self.interface)
    }
}

/// Show a reportable error to the operator; fatal errors pass through
fn report(interface: &mut dyn Interface, err: Error) -> Result<Outcome> {
    if err.is_fatal() {
        return Err(err);
    }
    warn!("{}", err);
    interface.report_failure(&err.to_string())?;
    Ok(Outcome::Fail)
}

/// Run `body` holding the method lock, releasing it on every exit path
fn with_method_lock<F>(
    lock: &mut MethodLock,
    interface: &mut dyn Interface,
    body: F,
) -> Result<Outcome>
where
    F: FnOnce(&mut dyn Interface) -> Result<Outcome>,
{
    let guard = match lock.acquire() {
        Ok(guard) => guard,
        Err(e) => return report(interface, e),
    };

    let outcome = body(&mut *interface)?;
    settle_release(guard.release(), outcome, interface)
}

/// Report a failed unlock without changing the operation's outcome
fn settle_release(
    released: Result<()>,
    outcome: Outcome,
    interface: &mut dyn Interface,
) -> Result<Outcome> {
    if let Err(e) = released {
        warn!("{}", e);
        interface.report_failure(UNLOCK_FAILURE)?;
    }
    Ok(outcome)
}
