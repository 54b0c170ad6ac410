// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Metadata types produced by aggregation.
//!
//! Descriptor sets are keyed by name in a `BTreeMap` so that two
//! aggregations of the same files serialize identically.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// A message type as declared by a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageTypeDescriptor {
    /// Type name (e.g., "sensor_msgs/Imu")
    pub name: String,
    /// md5sum of the definition
    pub md5sum: String,
    /// Definition text, surrounding whitespace trimmed
    pub definition: String,
}

/// A topic and the number of messages recorded on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDescriptor {
    /// Topic name
    pub name: String,
    /// Messages summed over connections (and files, at dataset level)
    pub message_count: u64,
    /// Message type name
    pub message_type: String,
    /// Latched topic
    pub latching: bool,
}

/// Metadata of one physical bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    /// File path
    pub path: PathBuf,
    /// Declared format version, `major * 100 + minor`
    pub version: u32,
    /// Earliest message time (ns)
    pub start_time: u64,
    /// Latest message time (ns)
    pub end_time: u64,
    /// `end_time - start_time` (ns)
    pub duration: u64,
    /// Messages in this file
    pub message_count: u64,
    /// Message types by name
    pub message_types: BTreeMap<String, MessageTypeDescriptor>,
    /// Topics by name
    pub topics: BTreeMap<String, TopicDescriptor>,
}

/// Metadata of one dataset, validated across all of its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMetadata {
    /// Dataset name
    pub name: String,
    /// Earliest message time over all files (ns)
    pub start_time: u64,
    /// Latest message time over all files (ns)
    pub end_time: u64,
    /// `end_time - start_time` (ns)
    pub duration: u64,
    /// Messages over all files
    pub message_count: u64,
    /// Message types by name
    pub message_types: BTreeMap<String, MessageTypeDescriptor>,
    /// Topics by name
    pub topics: BTreeMap<String, TopicDescriptor>,
    /// Per-file metadata, in dataset file order
    pub files: Vec<FileMetadata>,
}

impl DatasetMetadata {
    /// Look up a topic.
    pub fn topic(&self, name: &str) -> Option<&TopicDescriptor> {
        self.topics.get(name)
    }

    /// Look up a message type.
    pub fn message_type(&self, name: &str) -> Option<&MessageTypeDescriptor> {
        self.message_types.get(name)
    }
}
