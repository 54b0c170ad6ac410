// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Replay command - stream a dataset in chronological order.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;

use crate::common::{
    dataset_from_files, format_timestamp, hex_preview, parse_timestamp, ProgressBar, Result,
};
use bagstitch::meta::aggregate;
use bagstitch::mux::{ChannelHeader, ChannelId, ChannelSink, Multiplex, Subscription};
use bagstitch::{Config, RawMessage};

/// Bytes of payload shown with `--payload`
const PREVIEW_BYTES: usize = 16;

/// Merge the files of one dataset and print the subscribed channels.
#[derive(Args, Clone, Debug)]
pub struct ReplayCmd {
    /// Bag files of the dataset, in sequence order
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Topic name, or `topic:type` pattern with `*` wildcards (repeatable)
    #[arg(short, long = "subscribe", value_name = "SUB", required = true)]
    subscriptions: Vec<String>,

    /// Dataset name (defaults to the base name of the first file)
    #[arg(long)]
    name: Option<String>,

    /// Skip messages before this time (seconds, nanoseconds or RFC 3339)
    #[arg(long)]
    start: Option<String>,

    /// Skip messages after this time
    #[arg(long)]
    end: Option<String>,

    /// Show the first bytes of each payload
    #[arg(long)]
    payload: bool,

    /// Only print channel summaries
    #[arg(short, long)]
    quiet: bool,
}

impl ReplayCmd {
    pub fn run(self, config: &Config) -> Result<()> {
        let mut options = config.replay;
        if let Some(start) = &self.start {
            options.start_time = Some(parse_timestamp(start)?);
        }
        if let Some(end) = &self.end {
            options.end_time = Some(parse_timestamp(end)?);
        }

        let subscriptions = self
            .subscriptions
            .iter()
            .map(|s| Subscription::parse(s))
            .collect::<bagstitch::Result<Vec<_>>>()?;

        let dataset = dataset_from_files(&self.files, self.name)?;
        let meta = aggregate(&dataset)?;
        let mux = Multiplex::open(&dataset, &meta, &subscriptions, &options)?;

        for resolution in mux.resolutions() {
            if resolution.channels.is_empty() {
                println!("{}: no matching topic", resolution.subscription);
            }
        }

        let total: u64 = mux.channels().iter().map(|h| h.message_count).sum();

        let mut sink = PrintSink {
            payload: self.payload,
            quiet: self.quiet,
            counts: HashMap::new(),
            progress: ProgressBar::new(total, dataset.name.clone()),
        };
        let merged = mux.drain_into(&mut sink)?;
        sink.progress
            .finish_with_message(format!("{merged} messages merged"));

        Ok(())
    }
}

/// Prints channels to stdout.
struct PrintSink {
    payload: bool,
    quiet: bool,
    counts: HashMap<ChannelId, u64>,
    progress: ProgressBar,
}

impl ChannelSink for PrintSink {
    fn open(&mut self, header: &ChannelHeader) -> bagstitch::Result<()> {
        let group = header
            .group
            .as_deref()
            .map(|g| format!(" [{g}]"))
            .unwrap_or_default();
        println!(
            "open {} {} | {} | {} messages | {} .. {}{}",
            header.id,
            header.topic,
            header.message_type,
            header.message_count,
            format_timestamp(header.start_time),
            format_timestamp(header.end_time),
            group
        );
        Ok(())
    }

    fn message(&mut self, header: &ChannelHeader, message: &RawMessage) -> bagstitch::Result<()> {
        *self.counts.entry(header.id).or_default() += 1;
        self.progress.inc();

        if self.quiet {
            return Ok(());
        }
        if self.payload {
            println!(
                "{} {} {} {} bytes: {}",
                format_timestamp(message.timestamp),
                header.id,
                message.topic,
                message.len(),
                hex_preview(&message.data, PREVIEW_BYTES)
            );
        } else {
            println!(
                "{} {} {} {} bytes",
                format_timestamp(message.timestamp),
                header.id,
                message.topic,
                message.len()
            );
        }
        Ok(())
    }

    fn close(&mut self, header: &ChannelHeader) -> bagstitch::Result<()> {
        let count = self.counts.get(&header.id).copied().unwrap_or(0);
        println!("close {} {}: {} messages", header.id, header.topic, count);
        Ok(())
    }
}
