// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! TOML configuration.
//!
//! ```toml
//! [scan]
//! naming = "lenient"
//! orphans = "promote"
//!
//! [replay]
//! start_time = 1700000000000000000
//! ```
//!
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::mux::MuxOptions;
use crate::scan::ScanOptions;
use crate::{BagError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Dataset reconstruction
    pub scan: ScanOptions,
    /// Replay window
    pub replay: MuxOptions,
}

impl Config {
    /// The bundled defaults.
    pub fn load_default() -> Result<Self> {
        Self::parse(include_str!("../config/default.toml"))
    }

    /// Load a configuration file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            BagError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| BagError::config(e.to_string()))
    }
}
