// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Filename classification.
//!
//! `rosbag record --split` names its output
//! `<prefix>_<YYYY-MM-DD-hh-mm-ss>_<index>.bag`. Classification splits a
//! filename into that prefix (the base name), the timestamp and the index,
//! without touching the file.

use std::sync::OnceLock;

use regex::Regex;

use super::NamingConvention;

/// `<base>[_<timestamp>_<index>].bag`
const STRICT_PATTERN: &str = r"^(.+?)(?:_([0-9]{4}(?:-[0-9]{2}){5})_([0-9]+))?\.bag$";

/// `<base>[[_<timestamp>]_<index>].bag`
const LENIENT_PATTERN: &str = r"^(.+?)(?:(?:_([0-9]{4}(?:-[0-9]{2}){5}))?_([0-9]+))?\.bag$";

const BAG_SUFFIX: &str = ".bag";

static STRICT: OnceLock<Regex> = OnceLock::new();
static LENIENT: OnceLock<Regex> = OnceLock::new();

fn pattern(naming: NamingConvention) -> &'static Regex {
    match naming {
        NamingConvention::Strict => {
            STRICT.get_or_init(|| Regex::new(STRICT_PATTERN).expect("strict pattern compiles"))
        }
        NamingConvention::Lenient => {
            LENIENT.get_or_init(|| Regex::new(LENIENT_PATTERN).expect("lenient pattern compiles"))
        }
    }
}

/// A classified bag filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToken {
    /// Filename as listed
    pub filename: String,
    /// Recording prefix
    pub base_name: String,
    /// Recorder timestamp, kept verbatim
    pub timestamp: Option<String>,
    /// Split index; `None` is distinct from `Some(0)`
    pub index: Option<u64>,
}

impl FileToken {
    /// The filename without its `.bag` suffix.
    pub fn stem(&self) -> &str {
        self.filename
            .strip_suffix(BAG_SUFFIX)
            .unwrap_or(&self.filename)
    }
}

/// Classify one filename.
///
/// Returns `None` for names that do not end in `.bag`. Timestamps are not
/// validated as dates. An index too large for `u64` is treated as absent and
/// the whole stem becomes the base name.
pub fn classify(filename: &str, naming: NamingConvention) -> Option<FileToken> {
    if !filename.ends_with(BAG_SUFFIX) {
        return None;
    }
    let caps = pattern(naming).captures(filename)?;

    let index = match caps.get(3) {
        None => None,
        Some(digits) => match digits.as_str().parse::<u64>() {
            Ok(index) => Some(index),
            Err(_) => {
                let stem = &filename[..filename.len() - BAG_SUFFIX.len()];
                return Some(FileToken {
                    filename: filename.to_string(),
                    base_name: stem.to_string(),
                    timestamp: None,
                    index: None,
                });
            }
        },
    };

    Some(FileToken {
        filename: filename.to_string(),
        base_name: caps[1].to_string(),
        timestamp: caps.get(2).map(|m| m.as_str().to_string()),
        index,
    })
}
