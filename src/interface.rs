// src/interface.rs

//! Operator interaction
//!
//! The request operations never talk to the terminal directly. They go
//! through [`Interface`]: suspend the screen before a child runs, show a
//! blocking failure message, announce package tool runs, and let the
//! operator pick an access method.

use crate::error::{Error, Result};
use crate::method::Catalog;
use std::io::{self, Read, Write};

/// How the operator left the method selection menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitAction {
    /// Accept and save the catalog entry at this index
    Save(usize),
    /// Leave without choosing
    Abandon,
}

/// Terminal-facing collaborator of the request operations
pub trait Interface {
    /// Tear down the full-screen UI so a child can own the terminal
    fn suspend(&mut self);

    /// Show a progress line before the package tool runs
    fn announce(&mut self, message: &str) -> Result<()>;

    /// Show `reason` and block until the operator acknowledges it
    fn report_failure(&mut self, reason: &str) -> Result<()>;

    /// Let the operator pick a catalog entry; `current` is preselected
    fn choose_option(&mut self, catalog: &Catalog, current: Option<usize>) -> Result<QuitAction>;
}

/// Line-oriented terminal interface
pub struct ConsoleInterface {
    program: String,
    input: Box<dyn Read>,
    output: Box<dyn Write>,
}

impl ConsoleInterface {
    pub fn new(program: impl Into<String>, input: Box<dyn Read>, output: Box<dyn Write>) -> Self {
        Self {
            program: program.into(),
            input,
            output,
        }
    }

    /// Interface on the process's stdin and stdout
    pub fn stdio(program: impl Into<String>) -> Self {
        Self::new(program, Box::new(io::stdin()), Box::new(io::stdout()))
    }

    /// Read one line without buffering past it; `None` at end of input
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(0) => break,
                Ok(_) if byte[0] == b'\n' => break,
                Ok(_) => line.push(byte[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Acknowledge(e)),
            }
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl Interface for ConsoleInterface {
    fn suspend(&mut self) {
        let _ = self.output.flush();
    }

    fn announce(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()?;
        Ok(())
    }

    fn report_failure(&mut self, reason: &str) -> Result<()> {
        write!(self.output, "\n\n{}: {}\n", self.program, reason)?;
        write!(self.output, "\nPress <enter> to continue.")?;
        self.output.flush()?;
        self.read_line()?;
        writeln!(self.output)?;
        Ok(())
    }

    fn choose_option(&mut self, catalog: &Catalog, current: Option<usize>) -> Result<QuitAction> {
        let options = catalog.options();

        writeln!(self.output, "\nAccess methods available:")?;
        for (i, option) in options.iter().enumerate() {
            let mark = if Some(i) == current { '*' } else { ' ' };
            writeln!(
                self.output,
                " {}{:>3}. {:<12} {:<12} {}",
                mark,
                i + 1,
                option.method,
                option.name,
                option.summary
            )?;
        }

        loop {
            write!(
                self.output,
                "\nSelect an access method [1-{}], <enter> to keep the current one, q to quit: ",
                options.len()
            )?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                return Ok(QuitAction::Abandon);
            };

            match line.trim() {
                "" => match current {
                    Some(index) => return Ok(QuitAction::Save(index)),
                    None => writeln!(self.output, "No access method is selected yet.")?,
                },
                "q" | "Q" => return Ok(QuitAction::Abandon),
                choice => match choice.parse::<usize>() {
                    Ok(n) if (1..=options.len()).contains(&n) => {
                        if let Some(description) = &options[n - 1].description {
                            writeln!(self.output, "\n{}", description.trim_end())?;
                        }
                        return Ok(QuitAction::Save(n - 1));
                    }
                    _ => writeln!(self.output, "Invalid choice: {}", choice)?,
                },
            }
        }
    }
}
