// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for ROS1 bag files.
//!
//! This module provides the container parser, the sequential reader and
//! writer, and the filter and message types they share.

pub mod formats;

// Undecoded message records
pub mod message;
pub use message::RawMessage;

// Filter for topic and time filtering
pub mod filter;
pub use filter::{MessageFilter, TopicFilter};
