// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagstitch
//!
//! Reassemble split ROS1 bag recordings and replay them as one.
//!
//! `rosbag record --split` leaves a session on disk as several files. This
//! library turns such files back into logical datasets and works on them:
//! - **Discovery** in [`scan`]: group a directory listing into datasets
//! - **Metadata** in [`meta`]: aggregate time range, counts, topics and
//!   types across a dataset's files, rejecting files that disagree
//! - **Replay** in [`mux`]: merge the messages of all files in global
//!   timestamp order onto per-topic channels
//!
//! ## Architecture
//!
//! - `io/formats/bag/` - ROS1 bag container parser, sequential reader, writer
//! - `scan/` - filename classification and dataset reconstruction
//! - `meta/` - metadata extraction and cross-file validation
//! - `mux/` - subscriptions, channels and the k-way merge
//! - `config` - TOML configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagstitch::meta::aggregate;
//! use bagstitch::scan::{scan_dir, ScanOptions};
//!
//! let report = scan_dir("/data/recordings", &ScanOptions::default())?;
//! for dataset in &report.datasets {
//!     let meta = aggregate(dataset)?;
//!     println!("{}: {} messages", dataset.name, meta.message_count);
//! }
//! # Ok(())
//! # }
//! ```

// Core types
pub mod core;

// Re-export core types for convenience
pub use crate::core::{BagError, Result};

// I/O types (container parser, reader, writer, filters)
pub mod io;

// Dataset discovery
pub mod scan;

// Metadata aggregation
pub mod meta;

// Chronological multiplexing
pub mod mux;

// Configuration
pub mod config;

pub use config::Config;
pub use io::RawMessage;
pub use meta::{aggregate, DatasetMetadata};
pub use mux::{Multiplex, MuxEvent, MuxOptions, Subscription};
pub use scan::{reconstruct, scan_dir, DatasetDescriptor, ScanOptions, ScanReport};
