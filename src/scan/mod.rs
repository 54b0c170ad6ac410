// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset discovery.
//!
//! A recording session split by `rosbag record --split` lands on disk as
//! several files sharing one prefix. This module turns a directory listing
//! back into logical datasets:
//! - [`classify`] parses one filename into a [`FileToken`]
//! - [`reconstruct`] groups tokens into [`DatasetDescriptor`]s and orphans
//! - [`scan_dir`] lists a directory and reconstructs it

pub mod classify;
pub mod reconstruct;

pub use classify::{classify, FileToken};
pub use reconstruct::reconstruct;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{BagError, Result};

/// Filename convention to recognize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    /// `<base>[_<timestamp>_<index>].bag`
    #[default]
    Strict,
    /// Additionally `<base>_<index>.bag` without timestamp
    Lenient,
}

/// What to do with files that belong to no complete sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Return orphans separately and log a warning for each
    #[default]
    Report,
    /// Turn each orphan into a single-file dataset named after its stem
    Promote,
}

/// Reconstruction options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Filename convention
    pub naming: NamingConvention,
    /// Orphan handling
    pub orphans: OrphanPolicy,
}

/// One logical recording: an ordered, non-empty list of bag files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetDescriptor {
    /// Recording prefix shared by the files
    pub name: String,
    /// Files in ascending sequence order
    pub files: Vec<PathBuf>,
}

impl DatasetDescriptor {
    /// Create a descriptor; a dataset holds at least one file.
    pub fn new(name: impl Into<String>, files: Vec<PathBuf>) -> Result<Self> {
        let name = name.into();
        if files.is_empty() {
            return Err(BagError::EmptyDataset { dataset: name });
        }
        Ok(Self { name, files })
    }

    /// Build a descriptor from an explicit file list, naming it after the
    /// base name of the first file.
    pub fn from_files<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
        let first = files
            .first()
            .ok_or_else(|| BagError::EmptyDataset {
                dataset: String::new(),
            })?
            .as_ref();
        let filename = first
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = classify(&filename, NamingConvention::Lenient)
            .map(|t| t.base_name)
            .unwrap_or(filename);

        Self::new(name, files.iter().map(|p| p.as_ref().to_path_buf()).collect())
    }
}

/// Result of reconstructing one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Datasets in ascending order
    pub datasets: Vec<DatasetDescriptor>,
    /// Files belonging to no complete sequence, ascending
    pub orphans: Vec<PathBuf>,
}

/// List the regular files of `dir` and reconstruct its datasets.
///
/// Subdirectories are not descended into.
pub fn scan_dir<P: AsRef<Path>>(dir: P, options: &ScanOptions) -> Result<ScanReport> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| {
        BagError::io(
            "scan_dir",
            format!("Failed to list {}: {e}", dir.display()),
        )
    })?;

    let mut filenames = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            filenames.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    tracing::debug!(dir = %dir.display(), files = filenames.len(), "scanning directory");

    Ok(reconstruct(dir, &filenames, options))
}
