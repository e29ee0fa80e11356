// src/subprocess.rs

//! Running access method scripts and the package tool
//!
//! Each request runs exactly one child and blocks until it ends:
//!
//! - The interactive UI is suspended before the child starts
//! - SIGINT and SIGQUIT are ignored by this process while the child runs,
//!   so an operator interrupt reaches the child only; the child gets back
//!   whatever dispositions this process had before, so an inherited
//!   SIG_IGN stays ignored
//! - The wait status is classified; anything but a clean exit 0 is
//!   described on the diagnostic stream and the operator must press Enter
//!   before control returns
//!
//! There is no timeout: the operator cancels with an interrupt.

use crate::error::{Error, Result};
use crate::interface::Interface;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::ffi::{CStr, OsStr, OsString};
use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{Path, PathBuf};
use std::process::{self, Child, ExitStatus};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Signals the operator uses to cancel a running child
const INTERRUPT_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Result of a request operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Normal,
    Fail,
}

impl Outcome {
    pub fn is_normal(&self) -> bool {
        *self == Outcome::Normal
    }
}

/// A program invocation: executable, operator-facing label and argv
///
/// The first argument is passed as `argv[0]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: PathBuf,
    label: String,
    args: Vec<OsString>,
}

impl Command {
    pub fn new<P: AsRef<Path>>(program: P, label: impl Into<String>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            label: label.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn args_list(&self) -> &[OsString] {
        &self.args
    }

    /// Process builder whose child reinstates `restore` before exec
    fn to_process(&self, restore: Vec<(Signal, SigAction)>) -> process::Command {
        let mut cmd = process::Command::new(&self.program);
        if let Some((argv0, rest)) = self.args.split_first() {
            cmd.arg0(argv0).args(rest);
        }

        // SAFETY: only async-signal-safe calls between fork and exec
        unsafe {
            cmd.pre_exec(move || {
                for (sig, action) in &restore {
                    signal::sigaction(*sig, action).map_err(io::Error::from)?;
                }
                Ok(())
            });
        }
        cmd
    }
}

/// How a child ended, classified from its wait status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited with status 0
    Success,
    /// Exited with a nonzero status
    ExitCode(i32),
    /// Killed by a signal
    Signaled { signal: i32, core_dumped: bool },
    /// Any other wait status, kept raw
    Unknown(i32),
}

impl Termination {
    pub fn classify(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            if code == 0 {
                Self::Success
            } else {
                Self::ExitCode(code)
            }
        } else if let Some(signal) = status.signal() {
            Self::Signaled {
                signal,
                core_dumped: status.core_dumped(),
            }
        } else {
            Self::Unknown(status.into_raw())
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Success => Outcome::Normal,
            _ => Outcome::Fail,
        }
    }

    /// Operator-facing text completing "<label> ..."
    pub fn describe(&self) -> String {
        let mut text = String::new();
        match *self {
            Self::Success => {}
            Self::ExitCode(code) => {
                let _ = writeln!(text, "returned error exit status {}.", code);
            }
            Self::Signaled {
                signal,
                core_dumped,
            } => {
                if signal == Signal::SIGINT as i32 {
                    text.push_str("was interrupted.\n");
                } else {
                    let _ = writeln!(
                        text,
                        "was terminated by a signal: {}.",
                        signal_description(signal)
                    );
                }
                if core_dumped {
                    text.push_str("(It left a coredump.)\n");
                }
            }
            Self::Unknown(raw) => {
                let _ = writeln!(text, "failed with an unknown wait return code {}.", raw);
            }
        }
        text
    }
}

fn signal_description(signal: i32) -> String {
    // SAFETY: strsignal returns a NUL-terminated string valid until the next call
    let ptr = unsafe { libc::strsignal(signal) };
    if ptr.is_null() {
        return format!("signal {}", signal);
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

/// Interrupt signals ignored for as long as this value lives
struct IgnoredInterrupts {
    saved: Vec<(Signal, SigAction)>,
}

impl IgnoredInterrupts {
    fn install() -> Result<Self> {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let mut posture = Self { saved: Vec::new() };
        for sig in INTERRUPT_SIGNALS {
            // SAFETY: installing SIG_IGN runs no handler code
            let previous = unsafe { signal::sigaction(sig, &ignore) }.map_err(io::Error::from)?;
            posture.saved.push((sig, previous));
        }
        Ok(posture)
    }

    /// Dispositions in force before the interrupts were ignored
    fn saved(&self) -> Vec<(Signal, SigAction)> {
        self.saved.clone()
    }
}

impl Drop for IgnoredInterrupts {
    fn drop(&mut self) {
        for (sig, previous) in self.saved.drain(..).rev() {
            // SAFETY: restores a disposition previously returned by sigaction
            if let Err(e) = unsafe { signal::sigaction(sig, &previous) } {
                warn!("Unable to restore {} disposition: {}", sig, e);
            }
        }
    }
}

/// Child that is killed and reaped if we unwind before it has been waited for
struct RunningChild {
    child: Option<Child>,
}

impl RunningChild {
    fn wait(mut self) -> io::Result<ExitStatus> {
        let Some(child) = self.child.as_mut() else {
            return Err(io::Error::other("child already reaped"));
        };
        let status = child.wait()?;
        self.child = None;
        Ok(status)
    }
}

impl Drop for RunningChild {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            warn!("Terminating child process {}", child.id());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Runs one command at a time and reports failures to the operator
pub struct SubprocessRunner {
    input: Box<dyn Read>,
    diag: Box<dyn Write>,
    settle_delay: Duration,
}

impl SubprocessRunner {
    /// Runner using `input` for acknowledgments and `diag` for diagnostics
    pub fn new(input: Box<dyn Read>, diag: Box<dyn Write>, settle_delay: Duration) -> Self {
        Self {
            input,
            diag,
            settle_delay,
        }
    }

    /// Runner on the process's stdin and stderr
    pub fn stdio(settle_delay: Duration) -> Self {
        Self::new(Box::new(io::stdin()), Box::new(io::stderr()), settle_delay)
    }

    /// Run `command` to completion
    ///
    /// Returns [`Outcome::Normal`] only for a clean exit 0. Every other
    /// ending is described on the diagnostic stream and acknowledged by the
    /// operator first. Errors returned from here are fatal.
    pub fn run(&mut self, command: &Command, interface: &mut dyn Interface) -> Result<Outcome> {
        interface.suspend();

        info!(
            "Running {} ({})",
            command.label(),
            command.program().display()
        );
        debug!("Arguments: {:?}", command.args_list());

        let spawned = {
            let interrupts = IgnoredInterrupts::install()?;
            match command.to_process(interrupts.saved()).spawn() {
                Ok(child) => {
                    let running = RunningChild { child: Some(child) };
                    let status = running
                        .wait()
                        .map_err(|e| Error::Wait(command.label().to_string(), e))?;
                    Ok(status)
                }
                Err(e) => Err(e),
            }
        };

        let termination = match spawned {
            Ok(status) => Termination::classify(status),
            Err(e) => {
                warn!("Unable to execute {}: {}", command.program().display(), e);
                write!(self.diag, "\n{} ", command.label())?;
                writeln!(
                    self.diag,
                    "could not be executed ({}): {}.",
                    command.program().display(),
                    e
                )?;
                self.acknowledge()?;
                return Ok(Outcome::Fail);
            }
        };

        if termination == Termination::Success {
            debug!("{} completed successfully", command.label());
            thread::sleep(self.settle_delay);
            return Ok(Outcome::Normal);
        }

        warn!("{} failed: {:?}", command.label(), termination);
        write!(self.diag, "\n{} {}", command.label(), termination.describe())?;
        self.acknowledge()?;
        Ok(termination.outcome())
    }

    /// Prompt and block until the operator sends a newline
    ///
    /// Input ending before the newline is as fatal as a read error.
    fn acknowledge(&mut self) -> Result<()> {
        writeln!(self.diag, "Press <enter> to continue.")?;
        self.diag.flush()?;

        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => {
                    return Err(Error::Acknowledge(io::ErrorKind::UnexpectedEof.into()));
                }
                Ok(_) if byte[0] == b'\n' => return Ok(()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Acknowledge(e)),
            }
        }
    }
}
