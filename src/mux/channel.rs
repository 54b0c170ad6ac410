// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Output channels of the multiplexer.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::io::RawMessage;
use crate::Result;

/// Index of a channel within one multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata fixed when a channel opens.
///
/// `start_time` and `end_time` are the dataset bounds, not the bounds of
/// this topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHeader {
    /// Channel id
    pub id: ChannelId,
    /// Subscription text for channels opened by a pattern
    pub group: Option<String>,
    /// Topic name
    pub topic: String,
    /// Message type name
    pub message_type: String,
    /// Messages recorded on the topic in the whole dataset
    pub message_count: u64,
    /// Dataset start time (ns)
    pub start_time: u64,
    /// Dataset end time (ns)
    pub end_time: u64,
}

/// The channels one subscription opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionResolution {
    /// Subscription text
    pub subscription: String,
    /// Channels in topic name order; empty when nothing matched
    pub channels: Vec<ChannelId>,
}

/// One item of the merged stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxEvent {
    /// A message delivered to one channel.
    ///
    /// A message on a topic with several channels is shared between them.
    Message {
        /// Receiving channel
        channel: ChannelId,
        /// The message
        message: Arc<RawMessage>,
    },
    /// No further message will arrive on this channel.
    EndOfStream {
        /// Finished channel
        channel: ChannelId,
    },
}

impl MuxEvent {
    /// The channel this event belongs to.
    pub fn channel(&self) -> ChannelId {
        match self {
            Self::Message { channel, .. } | Self::EndOfStream { channel } => *channel,
        }
    }
}

/// Push-style consumer of multiplexed channels.
///
/// `open` is called for every channel before any message, `close` for every
/// channel after the last one.
pub trait ChannelSink {
    /// A channel opened.
    fn open(&mut self, header: &ChannelHeader) -> Result<()>;

    /// A message arrived on a channel.
    fn message(&mut self, header: &ChannelHeader, message: &RawMessage) -> Result<()>;

    /// A channel reached end of stream.
    fn close(&mut self, header: &ChannelHeader) -> Result<()>;
}
