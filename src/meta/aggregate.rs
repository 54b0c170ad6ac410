// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Metadata extraction and cross-file validation.
//!
//! Every file of a dataset is opened once. Its connections are folded into
//! file-level descriptor sets, and each file is then folded into the
//! dataset-level sets. A message type or topic that changes shape anywhere
//! along the way aborts the whole aggregation.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;

use crate::io::formats::bag::BagParser;
use crate::scan::DatasetDescriptor;
use crate::{BagError, Result};

use super::types::{DatasetMetadata, FileMetadata, MessageTypeDescriptor, TopicDescriptor};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Aggregate and validate the metadata of one dataset.
pub fn aggregate(dataset: &DatasetDescriptor) -> Result<DatasetMetadata> {
    // Descriptors built as struct literals skip the check in `DatasetDescriptor::new`
    if dataset.files.is_empty() {
        return Err(BagError::EmptyDataset {
            dataset: dataset.name.clone(),
        });
    }

    let init = DatasetMetadata {
        name: dataset.name.clone(),
        start_time: u64::MAX,
        end_time: 0,
        duration: 0,
        message_count: 0,
        message_types: BTreeMap::new(),
        topics: BTreeMap::new(),
        files: Vec::with_capacity(dataset.files.len()),
    };

    let mut meta = dataset.files.iter().try_fold(init, |mut acc, path| {
        let file = read_file_metadata(&dataset.name, path)?;

        acc.start_time = acc.start_time.min(file.start_time);
        acc.end_time = acc.end_time.max(file.end_time);
        acc.message_count += file.message_count;
        for ty in file.message_types.values() {
            merge_type(&mut acc.message_types, &dataset.name, ty.clone())?;
        }
        for topic in file.topics.values() {
            merge_topic(&mut acc.topics, &dataset.name, topic.clone())?;
        }
        acc.files.push(file);

        Ok::<_, BagError>(acc)
    })?;
    meta.duration = meta.end_time.saturating_sub(meta.start_time);

    tracing::debug!(
        dataset = %meta.name,
        files = meta.files.len(),
        topics = meta.topics.len(),
        messages = meta.message_count,
        "aggregated dataset metadata"
    );

    Ok(meta)
}

/// Read and validate the metadata of one file of `dataset`.
pub fn read_file_metadata(dataset: &str, path: &Path) -> Result<FileMetadata> {
    let parser = BagParser::open(path)?;
    let path_str = parser.path().to_string();

    let (Some(start), Some(end)) = (parser.start_time(), parser.end_time()) else {
        return Err(BagError::EmptyBag {
            dataset: dataset.to_string(),
            path: path_str,
        });
    };
    let start_time = via_float_seconds(start);
    let end_time = via_float_seconds(end);

    let counts = parser.message_counts();
    let mut message_types = BTreeMap::new();
    let mut topics = BTreeMap::new();
    let mut message_count = 0u64;

    for conn in parser.connections_sorted() {
        let count = counts
            .get(&conn.conn_id)
            .copied()
            .ok_or_else(|| BagError::MissingMessageCount {
                dataset: dataset.to_string(),
                path: path_str.clone(),
                topic: conn.topic.clone(),
                conn_id: conn.conn_id,
            })?;

        merge_type(
            &mut message_types,
            dataset,
            MessageTypeDescriptor {
                name: conn.message_type.clone(),
                md5sum: conn.md5sum.clone(),
                definition: conn.message_definition.trim().to_string(),
            },
        )?;
        merge_topic(
            &mut topics,
            dataset,
            TopicDescriptor {
                name: conn.topic.clone(),
                message_count: count,
                message_type: conn.message_type.clone(),
                latching: conn.is_latching()?,
            },
        )?;
        message_count += count;
    }

    tracing::debug!(
        dataset,
        path = %path_str,
        connections = parser.connections().len(),
        messages = message_count,
        "read bag metadata"
    );

    Ok(FileMetadata {
        path: path.to_path_buf(),
        version: parser.header().version_number(),
        start_time,
        end_time,
        duration: end_time.saturating_sub(start_time),
        message_count,
        message_types,
        topics,
    })
}

/// Round-trip a timestamp through floating-point seconds, truncating.
///
/// Timestamps more than about 2^53 ns after the epoch lose precision here,
/// exactly as they do for consumers that read bag times as seconds.
fn via_float_seconds(ns: u64) -> u64 {
    let sec = (ns / NANOS_PER_SEC) as f64;
    let nsec = (ns % NANOS_PER_SEC) as f64;
    ((sec + nsec / 1e9) * 1e9) as u64
}

/// Insert a message type, or check it against the one already known.
pub(crate) fn merge_type(
    types: &mut BTreeMap<String, MessageTypeDescriptor>,
    dataset: &str,
    ty: MessageTypeDescriptor,
) -> Result<()> {
    match types.entry(ty.name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(ty);
            Ok(())
        }
        Entry::Occupied(known) => {
            let known = known.get();
            let mismatch = |field: &'static str, expected: &str, found: &str| {
                BagError::TypeMismatch {
                    dataset: dataset.to_string(),
                    type_name: ty.name.clone(),
                    field,
                    expected: expected.to_string(),
                    found: found.to_string(),
                }
            };
            if known.md5sum != ty.md5sum {
                return Err(mismatch("md5sum", &known.md5sum, &ty.md5sum));
            }
            if known.definition != ty.definition {
                return Err(mismatch("definition", &known.definition, &ty.definition));
            }
            Ok(())
        }
    }
}

/// Insert a topic, or check it against the one already known and add its
/// message count.
pub(crate) fn merge_topic(
    topics: &mut BTreeMap<String, TopicDescriptor>,
    dataset: &str,
    topic: TopicDescriptor,
) -> Result<()> {
    match topics.entry(topic.name.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(topic);
            Ok(())
        }
        Entry::Occupied(mut known) => {
            let known = known.get_mut();
            let mismatch = |field: &'static str, expected: String, found: String| {
                BagError::TopicMismatch {
                    dataset: dataset.to_string(),
                    topic: topic.name.clone(),
                    field,
                    expected,
                    found,
                }
            };
            if known.message_type != topic.message_type {
                return Err(mismatch(
                    "message_type",
                    known.message_type.clone(),
                    topic.message_type.clone(),
                ));
            }
            if known.latching != topic.latching {
                return Err(mismatch(
                    "latching",
                    known.latching.to_string(),
                    topic.latching.to_string(),
                ));
            }
            known.message_count += topic.message_count;
            Ok(())
        }
    }
}
