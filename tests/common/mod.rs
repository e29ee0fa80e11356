// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! A fixture is a temporary tree with an administrative directory, a
//! system and a local method directory, and a fake package tool. Method
//! scripts are real `/bin/sh` scripts that log their arguments.

#![allow(dead_code)]

use methodctl::{
    Catalog, Config, Coordinator, Interface, MethodDirectory, MethodOption, MethodSource,
    QuitAction, Result, SubprocessRunner,
};
use std::cell::{Cell, RefCell};
use std::fs;
use std::io::{self, Cursor, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

/// Running a child changes process-wide signal dispositions
static SIGNALS: Mutex<()> = Mutex::new(());

/// Temporary admin dir, method dirs and fake dpkg.
///
/// Keep the fixture alive for the whole test to prevent cleanup. Only one
/// fixture exists at a time per test binary.
pub struct Fixture {
    pub temp_dir: TempDir,
    pub admin_dir: PathBuf,
    pub system_methods: PathBuf,
    pub local_methods: PathBuf,
    pub dpkg: PathBuf,
    _serial: MutexGuard<'static, ()>,
}

impl Fixture {
    pub fn new() -> Self {
        let serial = SIGNALS.lock().unwrap_or_else(|e| e.into_inner());
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();

        let admin_dir = root.join("admin");
        let system_methods = root.join("lib/methods");
        let local_methods = root.join("local/methods");
        for dir in [&admin_dir, &system_methods, &local_methods] {
            fs::create_dir_all(dir).unwrap();
        }

        let dpkg = root.join("bin/dpkg");
        fs::create_dir_all(dpkg.parent().unwrap()).unwrap();
        let log = root.join("dpkg.log");
        write_script(
            &dpkg,
            &format!("printf '%s\\n' \"$@\" > '{}'\nexit 0\n", log.display()),
        );

        Self {
            temp_dir,
            admin_dir,
            system_methods,
            local_methods,
            dpkg,
            _serial: serial,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            admin_dir: self.admin_dir.clone(),
            method_dirs: vec![self.system_methods.clone(), self.local_methods.clone()],
            dpkg: self.dpkg.clone(),
            settle_delay_ms: 0,
        }
    }

    pub fn lock_path(&self) -> PathBuf {
        self.admin_dir.join("methlock")
    }

    pub fn selection_path(&self) -> PathBuf {
        self.admin_dir.join("cmethopt")
    }

    pub fn select(&self, method: &str, option: &str) {
        fs::write(self.selection_path(), format!("{} {}\n", method, option)).unwrap();
    }

    /// Arguments the fake dpkg was last run with
    pub fn dpkg_args(&self) -> Option<Vec<String>> {
        read_lines(&self.temp_dir.path().join("dpkg.log"))
    }

    /// Create a method whose scripts log `$0 $@` to `<method>.<script>.log`
    /// under the fixture root and exit with the given codes
    pub fn add_method(
        &self,
        methods_dir: &Path,
        method: &str,
        names: &str,
        exits: [i32; 3],
    ) -> PathBuf {
        let dir = methods_dir.join(method);
        fs::create_dir_all(&dir).unwrap();
        for (script, code) in ["update", "install", "setup"].into_iter().zip(exits) {
            let log = self.script_log(method, script);
            write_script(
                &dir.join(script),
                &format!(
                    "printf '%s\\n' \"$0\" \"$@\" > '{}'\nexit {}\n",
                    log.display(),
                    code
                ),
            );
        }
        fs::write(dir.join("names"), names).unwrap();
        dir
    }

    pub fn script_log(&self, method: &str, script: &str) -> PathBuf {
        self.temp_dir
            .path()
            .join(format!("{}.{}.log", method, script))
    }

    /// Lines logged by a method script, `None` if it never ran
    pub fn script_args(&self, method: &str, script: &str) -> Option<Vec<String>> {
        read_lines(&self.script_log(method, script))
    }
}

pub fn read_lines(path: &Path) -> Option<Vec<String>> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.lines().map(str::to_string).collect())
}

pub fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Diagnostic sink the test can read back
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// What the operator saw and did
#[derive(Debug, Default)]
pub struct InterfaceLog {
    pub suspended: usize,
    pub announcements: Vec<String>,
    pub failures: Vec<String>,
    pub menus: Vec<Option<usize>>,
    pub choice: Option<QuitAction>,
}

/// Interface double shared between the coordinator and the test
#[derive(Clone, Default)]
pub struct ScriptedInterface(pub Rc<RefCell<InterfaceLog>>);

impl ScriptedInterface {
    pub fn choosing(choice: QuitAction) -> Self {
        let ui = Self::default();
        ui.0.borrow_mut().choice = Some(choice);
        ui
    }

    pub fn failures(&self) -> Vec<String> {
        self.0.borrow().failures.clone()
    }

    pub fn menus(&self) -> Vec<Option<usize>> {
        self.0.borrow().menus.clone()
    }
}

impl Interface for ScriptedInterface {
    fn suspend(&mut self) {
        self.0.borrow_mut().suspended += 1;
    }

    fn announce(&mut self, message: &str) -> Result<()> {
        self.0.borrow_mut().announcements.push(message.to_string());
        Ok(())
    }

    fn report_failure(&mut self, reason: &str) -> Result<()> {
        self.0.borrow_mut().failures.push(reason.to_string());
        Ok(())
    }

    fn choose_option(&mut self, _catalog: &Catalog, current: Option<usize>) -> Result<QuitAction> {
        let mut log = self.0.borrow_mut();
        log.menus.push(current);
        Ok(log.choice.unwrap_or(QuitAction::Abandon))
    }
}

/// Filesystem discovery that counts directory scans
pub struct CountingSource {
    pub scans: Rc<Cell<usize>>,
}

impl MethodSource for CountingSource {
    fn discover(&self, dir: &Path, options: &mut Vec<MethodOption>) -> Result<()> {
        self.scans.set(self.scans.get() + 1);
        MethodDirectory.discover(dir, options)
    }
}

/// Coordinator on the fixture with scripted operator input
pub fn coordinator_with(
    config: Config,
    source: Box<dyn MethodSource>,
    ui: &ScriptedInterface,
    input: &str,
) -> (Coordinator, SharedBuffer) {
    let diag = SharedBuffer::default();
    let runner = SubprocessRunner::new(
        Box::new(Cursor::new(input.as_bytes().to_vec())),
        Box::new(diag.clone()),
        Duration::ZERO,
    );
    let coordinator = Coordinator::new(config, source, runner, Box::new(ui.clone()));
    (coordinator, diag)
}

pub fn coordinator(fixture: &Fixture, ui: &ScriptedInterface) -> (Coordinator, SharedBuffer) {
    coordinator_with(fixture.config(), Box::new(MethodDirectory), ui, "\n")
}
