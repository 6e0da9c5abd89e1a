//! This module provides the `DescriptionLoader` struct, responsible for loading machine
//! descriptions from files, directories and strings, in either the JSON or the text format.

use crate::description::MachineDescription;
use crate::parser::parse;
use crate::types::{MachineError, MAX_DESCRIPTION_SIZE};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The source formats a description can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// The JSON wire format (`.json`).
    Json,
    /// The compact text format (`.tm`).
    Text,
}

impl Format {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "tm" => Some(Format::Text),
            _ => None,
        }
    }
}

/// `DescriptionLoader` is a utility struct for loading machine descriptions.
pub struct DescriptionLoader;

impl DescriptionLoader {
    /// Loads a single description from the specified file path.
    ///
    /// The format is picked from the extension: `.json` or `.tm`.
    ///
    /// # Returns
    ///
    /// * `Ok(MachineDescription)` if the file is read, parsed and valid.
    /// * `Err(MachineError::FileError)` if the file cannot be read or has an unknown extension.
    /// * `Err(MachineError::MalformedDescription)` if the file is too large or invalid.
    /// * `Err(MachineError::ParseError)` if a text description has syntax errors.
    pub fn load(path: &Path) -> Result<MachineDescription, MachineError> {
        let format = Format::from_path(path).ok_or_else(|| {
            MachineError::FileError(format!(
                "Unsupported description file {}: expected a .json or .tm extension",
                path.display()
            ))
        })?;

        let content = fs::read_to_string(path).map_err(|e| {
            MachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), ?format, "loading description");
        Self::load_from_str(&content, format)
    }

    /// Loads a description from string content in the given format.
    pub fn load_from_str(content: &str, format: Format) -> Result<MachineDescription, MachineError> {
        if content.len() > MAX_DESCRIPTION_SIZE {
            return Err(MachineError::malformed(format!(
                "description is {} bytes, the limit is {} bytes",
                content.len(),
                MAX_DESCRIPTION_SIZE
            )));
        }

        match format {
            Format::Json => MachineDescription::from_json(content),
            Format::Text => parse(content),
        }
    }

    /// Loads every `.json` and `.tm` file in a directory.
    ///
    /// Directories and files with other extensions are skipped. Results are sorted by path.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, MachineDescription), MachineError>>` - One entry per recognised
    ///   file, holding either its path and description or the error that prevented loading it.
    pub fn load_all(directory: &Path) -> Vec<Result<(PathBuf, MachineDescription), MachineError>> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(MachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if !path.is_dir() && Format::from_path(&path).is_some() {
                        paths.push(path);
                    }
                }
                Err(e) => results.push(Err(MachineError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        results.extend(paths.into_iter().map(|path| {
            Self::load(&path)
                .map(|description| (path.clone(), description))
                .map_err(|e| {
                    MachineError::FileError(format!(
                        "Failed to load description from {}: {}",
                        path.display(),
                        e
                    ))
                })
        }));
        results
    }
}
