// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! K-way chronological merge over the files of one dataset.
//!
//! One [`BagMessageReader`] per file contributes its next message to a
//! min-heap keyed by `(timestamp, file index)`. Popping the heap yields the
//! globally earliest message, with ties going to the earlier file. Each
//! popped message fans out to every channel subscribed to its topic.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;

use serde::Deserialize;

use crate::io::filter::{MessageFilter, TopicFilter};
use crate::io::formats::bag::BagMessageReader;
use crate::io::RawMessage;
use crate::meta::DatasetMetadata;
use crate::scan::DatasetDescriptor;
use crate::{BagError, Result};

use super::channel::{ChannelHeader, ChannelId, ChannelSink, MuxEvent, SubscriptionResolution};
use super::subscription::Subscription;

/// Replay options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MuxOptions {
    /// Skip messages before this time (ns, inclusive)
    pub start_time: Option<u64>,
    /// Skip messages after this time (ns, inclusive)
    pub end_time: Option<u64>,
}

/// Next message of one file, waiting in the heap.
#[derive(Debug)]
struct Pending {
    time: u64,
    file: usize,
    message: RawMessage,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.file).cmp(&(other.time, other.file))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Merging,
    Closing,
    Done,
}

/// Chronological multiplexer over one dataset.
///
/// Iterating yields every matched message once per subscribed channel, in
/// non-decreasing timestamp order, followed by one
/// [`MuxEvent::EndOfStream`] per channel. The first error ends the stream.
/// Dropping the multiplexer releases every open file.
pub struct Multiplex {
    dataset: String,
    channels: Vec<ChannelHeader>,
    resolutions: Vec<SubscriptionResolution>,
    routes: HashMap<String, Vec<ChannelId>>,
    paths: Vec<String>,
    readers: Vec<Option<BagMessageReader>>,
    heap: BinaryHeap<Reverse<Pending>>,
    outbox: VecDeque<MuxEvent>,
    last_time: Option<u64>,
    emitted: u64,
    state: State,
}

impl Multiplex {
    /// Resolve subscriptions and open the dataset's files.
    ///
    /// When no subscription resolves to a topic no file is opened and the
    /// stream is empty.
    pub fn open(
        dataset: &DatasetDescriptor,
        metadata: &DatasetMetadata,
        subscriptions: &[Subscription],
        options: &MuxOptions,
    ) -> Result<Self> {
        let mut channels = Vec::new();
        let mut resolutions = Vec::with_capacity(subscriptions.len());
        let mut routes: HashMap<String, Vec<ChannelId>> = HashMap::new();

        for subscription in subscriptions {
            let text = subscription.to_string();
            let group = subscription.is_pattern().then(|| text.clone());
            let mut opened = Vec::new();

            for topic in subscription.resolve(metadata) {
                let id = ChannelId(channels.len());
                channels.push(ChannelHeader {
                    id,
                    group: group.clone(),
                    topic: topic.name.clone(),
                    message_type: topic.message_type.clone(),
                    message_count: topic.message_count,
                    start_time: metadata.start_time,
                    end_time: metadata.end_time,
                });
                routes.entry(topic.name.clone()).or_default().push(id);
                opened.push(id);
            }

            if opened.is_empty() {
                tracing::debug!(
                    dataset = %dataset.name,
                    subscription = %text,
                    "subscription matched no topic"
                );
            }
            resolutions.push(SubscriptionResolution {
                subscription: text,
                channels: opened,
            });
        }

        let mut mux = Self {
            dataset: dataset.name.clone(),
            channels,
            resolutions,
            routes,
            paths: Vec::new(),
            readers: Vec::new(),
            heap: BinaryHeap::new(),
            outbox: VecDeque::new(),
            last_time: None,
            emitted: 0,
            state: State::Merging,
        };

        if mux.channels.is_empty() {
            mux.state = State::Done;
            return Ok(mux);
        }

        let filter = MessageFilter::all()
            .with_topics(TopicFilter::include(mux.routes.keys().cloned()))
            .with_time_range(options.start_time, options.end_time);

        for path in &dataset.files {
            let reader = BagMessageReader::open(path, &filter)?;
            mux.paths.push(reader.path().to_string());
            mux.readers.push(Some(reader));
        }
        for file in 0..mux.readers.len() {
            mux.refill(file)?;
        }

        tracing::debug!(
            dataset = %mux.dataset,
            files = mux.readers.len(),
            channels = mux.channels.len(),
            "multiplexer opened"
        );

        Ok(mux)
    }

    /// Headers of every opened channel, indexed by [`ChannelId`].
    pub fn channels(&self) -> &[ChannelHeader] {
        &self.channels
    }

    /// Header of one channel.
    pub fn channel(&self, id: ChannelId) -> Option<&ChannelHeader> {
        self.channels.get(id.0)
    }

    /// How each subscription resolved, in subscription order.
    pub fn resolutions(&self) -> &[SubscriptionResolution] {
        &self.resolutions
    }

    /// Number of distinct messages merged so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Push the whole stream into `sink`.
    ///
    /// Returns the number of distinct messages merged.
    pub fn drain_into<S: ChannelSink + ?Sized>(mut self, sink: &mut S) -> Result<u64> {
        let channels = self.channels.clone();
        for header in &channels {
            sink.open(header)?;
        }

        for event in self.by_ref() {
            match event? {
                MuxEvent::Message { channel, message } => {
                    sink.message(&channels[channel.0], &message)?;
                }
                MuxEvent::EndOfStream { channel } => {
                    sink.close(&channels[channel.0])?;
                }
            }
        }

        Ok(self.emitted)
    }

    /// Pull the next message of `file` into the heap, dropping the reader
    /// once it is exhausted.
    fn refill(&mut self, file: usize) -> Result<()> {
        let Some(reader) = self.readers[file].as_mut() else {
            return Ok(());
        };

        match reader.next() {
            Some(Ok(message)) => {
                self.heap.push(Reverse(Pending {
                    time: message.timestamp,
                    file,
                    message,
                }));
            }
            Some(Err(e)) => return Err(e),
            None => {
                tracing::debug!(path = %self.paths[file], "reader exhausted");
                self.readers[file] = None;
            }
        }
        Ok(())
    }

    /// Merge one message into the outbox.
    fn step(&mut self) -> Result<()> {
        let Some(Reverse(pending)) = self.heap.pop() else {
            self.readers.clear();
            self.state = State::Closing;
            return Ok(());
        };

        if let Some(previous) = self.last_time {
            if pending.time < previous {
                return Err(BagError::NonMonotonic {
                    dataset: self.dataset.clone(),
                    path: self.paths[pending.file].clone(),
                    topic: pending.message.topic,
                    previous,
                    found: pending.time,
                });
            }
        }
        self.last_time = Some(pending.time);
        self.emitted += 1;

        self.refill(pending.file)?;

        let message = Arc::new(pending.message);
        if let Some(targets) = self.routes.get(&message.topic) {
            for &channel in targets {
                self.outbox.push_back(MuxEvent::Message {
                    channel,
                    message: Arc::clone(&message),
                });
            }
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.readers.clear();
        self.heap.clear();
        self.outbox.clear();
        self.state = State::Done;
    }
}

impl Iterator for Multiplex {
    type Item = Result<MuxEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.outbox.pop_front() {
                return Some(Ok(event));
            }

            match self.state {
                State::Done => return None,
                State::Closing => {
                    self.outbox.extend(
                        self.channels
                            .iter()
                            .map(|h| MuxEvent::EndOfStream { channel: h.id }),
                    );
                    self.state = State::Done;
                }
                State::Merging => {
                    if let Err(e) = self.step() {
                        tracing::error!(dataset = %self.dataset, error = %e, "merge aborted");
                        self.abort();
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(time: u64, file: usize) -> Reverse<Pending> {
        Reverse(Pending {
            time,
            file,
            message: RawMessage::new("/t", Vec::new(), time),
        })
    }

    #[test]
    fn test_heap_orders_by_time_then_file() {
        let mut heap = BinaryHeap::new();
        heap.push(pending(5, 0));
        heap.push(pending(3, 1));
        heap.push(pending(3, 0));
        heap.push(pending(4, 2));

        let order: Vec<(u64, usize)> = std::iter::from_fn(|| heap.pop())
            .map(|Reverse(p)| (p.time, p.file))
            .collect();
        assert_eq!(order, vec![(3, 0), (3, 1), (4, 2), (5, 0)]);
    }

    #[test]
    fn test_multiplex_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Multiplex>();
    }
}
