// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Scan command - group the bags of a directory into datasets.

use std::path::PathBuf;

use clap::Args;

use crate::common::Result;
use bagstitch::scan::{scan_dir, NamingConvention, OrphanPolicy};
use bagstitch::Config;

/// List the datasets and orphans of one directory.
#[derive(Args, Clone, Debug)]
pub struct ScanCmd {
    /// Directory to scan (not recursive)
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Also accept `<base>_<index>.bag` names without timestamp
    #[arg(long)]
    lenient: bool,

    /// Report orphaned bags as single-file datasets
    #[arg(long)]
    promote_orphans: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

impl ScanCmd {
    pub fn run(self, config: &Config) -> Result<()> {
        let mut options = config.scan;
        if self.lenient {
            options.naming = NamingConvention::Lenient;
        }
        if self.promote_orphans {
            options.orphans = OrphanPolicy::Promote;
        }

        let report = scan_dir(&self.dir, &options)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("=== {} ===", self.dir.display());
        println!("Datasets: {}", report.datasets.len());
        for dataset in &report.datasets {
            println!("  {} ({} files)", dataset.name, dataset.files.len());
            for file in &dataset.files {
                println!("    {}", file.display());
            }
        }

        if !report.orphans.is_empty() {
            println!();
            println!("Orphans: {}", report.orphans.len());
            for orphan in &report.orphans {
                println!("  {}", orphan.display());
            }
        }

        Ok(())
    }
}
