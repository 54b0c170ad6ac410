// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! BAG format implementation.
//!
//! This module provides the ROS1 bag container layer:
//! - Memory-mapped parsing of the header, connection table and chunk index
//! - Sequential, filtered message reading one chunk at a time
//! - A writer producing indexed or unindexed bags with optional chunk compression

// Parser utilities
pub mod parser;

// Sequential reader implementation
pub mod reader;

// Writer implementation
pub mod writer;

// Re-exports
pub use parser::{BagChunkInfo, BagConnection, BagHeader, BagParser};
pub use reader::BagMessageReader;
pub use writer::{BagMessage, BagWriter, Compression, ConnectionSpec};
