// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset metadata aggregation.
//!
//! [`aggregate`] opens each file of a [`DatasetDescriptor`](crate::scan::DatasetDescriptor),
//! reads its time bounds, connection table and message counts, and merges
//! them into one [`DatasetMetadata`]. Disagreement between files on a type
//! or topic is an integrity fault, never a warning.

pub mod aggregate;
pub mod types;

pub use aggregate::{aggregate, read_file_metadata};
pub use types::{DatasetMetadata, FileMetadata, MessageTypeDescriptor, TopicDescriptor};
