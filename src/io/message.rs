// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Undecoded message type shared by the readers and the multiplexer.

/// Raw message data with its topic and timestamp (undecoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Topic the message was recorded on
    pub topic: String,
    /// Serialized message bytes
    pub data: Vec<u8>,
    /// Record timestamp (nanoseconds since Unix epoch)
    pub timestamp: u64,
}

impl RawMessage {
    /// Create a new RawMessage.
    pub fn new(topic: impl Into<String>, data: Vec<u8>, timestamp: u64) -> Self {
        Self {
            topic: topic.into(),
            data,
            timestamp,
        }
    }

    /// Get the data length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the message has no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
