// src/method/parse.rs

//! Filesystem discovery of access methods
//!
//! Layout of one method directory:
//!
//! ```text
//! <methods-dir>/<method>/update
//! <methods-dir>/<method>/install
//! <methods-dir>/<method>/setup
//! <methods-dir>/<method>/names          "<index> <option> <summary>" per line
//! <methods-dir>/<method>/desc.<option>  optional long description
//! ```

use super::{MethodOption, MethodScript, MethodSource};
use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Characters allowed in method and option names
const NAME_CHARS: &str = "abcdefghijklmnopqrstuvwxyz0123456789+-._";

/// Longest option index accepted in a `names` file
const MAX_INDEX_LEN: usize = 5;

const NAMES_FILE: &str = "names";
const DESCRIPTION_PREFIX: &str = "desc.";

/// Reads methods laid out in the standard dpkg method directory format
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodDirectory;

impl MethodSource for MethodDirectory {
    fn discover(&self, dir: &Path, options: &mut Vec<MethodOption>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Method directory {} does not exist", dir.display());
                return Ok(());
            }
            Err(e) => return Err(Error::Discovery(dir.to_path_buf(), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::Discovery(dir.to_path_buf(), e))?;
            if let Some(name) = entry.file_name().to_str() {
                if is_valid_name(name) && entry.path().is_dir() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();

        for method in names {
            read_method(&dir.join(&method), &method, options);
        }
        Ok(())
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && name.chars().all(|c| NAME_CHARS.contains(c))
}

fn read_method(method_dir: &Path, method: &str, options: &mut Vec<MethodOption>) {
    for script in MethodScript::ALL {
        if !method_dir.join(script.file_name()).is_file() {
            debug!("Skipping method {}: no {} script", method, script);
            return;
        }
    }

    let names = match fs::read_to_string(method_dir.join(NAMES_FILE)) {
        Ok(content) => content,
        Err(e) => {
            debug!("Skipping method {}: unable to read {}: {}", method, NAMES_FILE, e);
            return;
        }
    };

    let mut found: Vec<MethodOption> = names
        .lines()
        .enumerate()
        .filter_map(|(lineno, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let parsed = parse_names_line(line);
            if parsed.is_none() {
                warn!(
                    "Ignoring malformed line {} in {}/{}",
                    lineno + 1,
                    method_dir.display(),
                    NAMES_FILE
                );
            }
            parsed
        })
        .map(|(index, name, summary)| {
            let description =
                fs::read_to_string(method_dir.join(format!("{}{}", DESCRIPTION_PREFIX, name)))
                    .ok();
            MethodOption {
                method: method.to_string(),
                name: name.to_string(),
                method_dir: method_dir.to_path_buf(),
                index: index.to_string(),
                summary: summary.to_string(),
                description,
            }
        })
        .collect();

    found.sort_by(|a, b| a.index.cmp(&b.index));
    debug!("Method {} offers {} option(s)", method, found.len());
    options.extend(found);
}

/// Split a `names` line into (index, option, summary)
fn parse_names_line(line: &str) -> Option<(&str, &str, &str)> {
    let (index, rest) = line.split_once(char::is_whitespace)?;
    if index.is_empty()
        || index.len() > MAX_INDEX_LEN
        || !index.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }

    let rest = rest.trim_start();
    let (name, summary) = match rest.split_once(char::is_whitespace) {
        Some((name, summary)) => (name, summary.trim()),
        None => (rest, ""),
    };
    if !is_valid_name(name) {
        return None;
    }
    Some((index, name, summary))
}
