// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Meta command - aggregate and validate the metadata of one dataset.

use std::path::PathBuf;

use clap::Args;

use crate::common::{dataset_from_files, format_duration, format_timestamp, Result};
use bagstitch::meta::aggregate;
use bagstitch::{Config, DatasetMetadata};

/// Aggregate metadata across the files of one dataset.
#[derive(Args, Clone, Debug)]
pub struct MetaCmd {
    /// Bag files of the dataset, in sequence order
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Dataset name (defaults to the base name of the first file)
    #[arg(long)]
    name: Option<String>,

    /// Print a human-readable summary instead of JSON
    #[arg(long)]
    summary: bool,
}

impl MetaCmd {
    pub fn run(self, _config: &Config) -> Result<()> {
        let dataset = dataset_from_files(&self.files, self.name)?;
        let meta = aggregate(&dataset)?;

        if self.summary {
            print_summary(&meta);
        } else {
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Ok(())
    }
}

fn print_summary(meta: &DatasetMetadata) {
    println!("=== {} ===", meta.name);
    println!("Files: {}", meta.files.len());
    println!("Messages: {}", meta.message_count);
    println!("Start: {}", format_timestamp(meta.start_time));
    println!("End: {}", format_timestamp(meta.end_time));
    println!("Duration: {}", format_duration(meta.duration));

    println!();
    println!("Topics:");
    for topic in meta.topics.values() {
        let latched = if topic.latching { " (latched)" } else { "" };
        println!(
            "  {} | {} | {} messages{}",
            topic.name, topic.message_type, topic.message_count, latched
        );
    }

    println!();
    println!("Files:");
    for file in &meta.files {
        println!(
            "  {} | v{} | {} messages | {}",
            file.path.display(),
            file.version,
            file.message_count,
            format_duration(file.duration)
        );
    }
}
