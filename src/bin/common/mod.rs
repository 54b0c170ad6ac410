// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for CLI commands.

use std::io::IsTerminal as _;
use std::path::PathBuf;

use bagstitch::DatasetDescriptor;

pub use anyhow::Result as CliResult;
pub type Result<T = ()> = CliResult<T>;

/// Format a duration in nanoseconds to human-readable string.
pub fn format_duration(nanos: u64) -> String {
    let secs = nanos / 1_000_000_000;
    let millis = (nanos % 1_000_000_000) / 1_000_000;

    if secs >= 3600 {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    } else if secs >= 60 {
        let minutes = secs / 60;
        let remaining_secs = secs % 60;
        format!("{}m {}s", minutes, remaining_secs)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}

/// Format a timestamp in nanoseconds with millisecond precision.
pub fn format_timestamp(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let subsec = (nanos % 1_000_000_000) as u32;

    match chrono::DateTime::<chrono::Utc>::from_timestamp(secs, subsec) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        None => format!("{} ns", nanos),
    }
}

/// Parse a timestamp string to nanoseconds.
///
/// Accepts:
/// - Unix timestamp in seconds: "1234567890"
/// - Unix timestamp in nanoseconds: "1234567890000000000"
/// - RFC 3339: "2023-01-01T00:00:00Z"
pub fn parse_timestamp(s: &str) -> CliResult<u64> {
    if let Ok(n) = s.parse::<u64>() {
        // Below year 3000 as seconds
        return Ok(if n < 32503680000 {
            n * 1_000_000_000
        } else {
            n
        });
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        let nanos = dt
            .timestamp_nanos_opt()
            .ok_or_else(|| anyhow::anyhow!("Timestamp out of range: {s}"))?;
        return u64::try_from(nanos).map_err(|_| anyhow::anyhow!("Timestamp before epoch: {s}"));
    }

    Err(anyhow::anyhow!("Invalid timestamp: {s}"))
}

/// Build the dataset for an explicit file list.
pub fn dataset_from_files(files: &[PathBuf], name: Option<String>) -> Result<DatasetDescriptor> {
    let mut dataset = DatasetDescriptor::from_files(files)?;
    if let Some(name) = name {
        dataset.name = name;
    }
    Ok(dataset)
}

/// Render the first `max` bytes of a payload as hex.
pub fn hex_preview(data: &[u8], max: usize) -> String {
    let mut out = hex::encode(&data[..data.len().min(max)]);
    if data.len() > max {
        out.push_str(" ..");
    }
    out
}

/// Progress bar wrapper for consistent progress reporting.
pub struct ProgressBar {
    inner: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a new progress bar, hidden when stderr is not a terminal.
    pub fn new(total: u64, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let inner = if std::io::stderr().is_terminal() {
            let pb = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            {
                pb.set_style(style.progress_chars("=>-"));
            }
            pb.set_prefix(prefix);
            Some(pb)
        } else {
            None
        };
        Self { inner }
    }

    /// Advance by one.
    pub fn inc(&self) {
        if let Some(pb) = &self.inner {
            pb.inc(1);
        }
    }

    /// Finish the progress bar with a message.
    pub fn finish_with_message(&self, msg: String) {
        if let Some(pb) = &self.inner {
            pb.finish_with_message(msg);
        }
    }
}
