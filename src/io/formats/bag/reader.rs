// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Forward-only BAG message reader.
//!
//! [`BagMessageReader`] walks the chunks of one bag in file order and
//! yields its messages one at a time, restricted by a [`MessageFilter`].
//! Only one chunk is decompressed at a time. Messages are yielded in
//! record order, chunk by chunk, exactly as they were written; no reordering
//! happens within or across chunks. The ROS recorder writes in receive
//! order, so a well-formed bag reads back chronologically.
//!
//! The reader is finite and cannot be restarted. Dropping it releases the
//! file mapping.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use crate::io::filter::MessageFilter;
use crate::io::message::RawMessage;
use crate::Result;

use super::parser::{BagMessageData, BagParser};

/// Sequential raw-message reader over one bag file.
pub struct BagMessageReader {
    /// Parsed container
    parser: BagParser,
    /// Topic of every connection that passes the filter
    conn_topics: HashMap<u32, String>,
    /// Time window
    filter: MessageFilter,
    /// Indices into `parser.chunks()` still to visit
    chunk_queue: VecDeque<usize>,
    /// Messages of the current chunk, in record order
    pending: VecDeque<BagMessageData>,
    /// Set once the reader has failed or is exhausted
    done: bool,
}

impl BagMessageReader {
    /// Open a bag for sequential reading.
    pub fn open<P: AsRef<Path>>(path: P, filter: &MessageFilter) -> Result<Self> {
        let parser = BagParser::open(path)?;
        Ok(Self::from_parser(parser, filter))
    }

    /// Build a reader from an already opened parser.
    pub fn from_parser(parser: BagParser, filter: &MessageFilter) -> Self {
        let conn_topics: HashMap<u32, String> = parser
            .connections()
            .values()
            .filter(|c| filter.topics.should_include(&c.topic))
            .map(|c| (c.conn_id, c.topic.clone()))
            .collect();
        let wanted: HashSet<u32> = conn_topics.keys().copied().collect();

        let mut order: Vec<usize> = parser
            .chunks()
            .iter()
            .enumerate()
            .filter(|(_, chunk)| {
                chunk.contains_any(&wanted) && filter.overlaps(chunk.start_time, chunk.end_time)
            })
            .map(|(i, _)| i)
            .collect();
        order.sort_by_key(|&i| parser.chunks()[i].chunk_pos);

        tracing::debug!(
            path = parser.path(),
            connections = conn_topics.len(),
            chunks = order.len(),
            "opened bag for sequential reading"
        );

        Self {
            parser,
            conn_topics,
            filter: filter.clone(),
            chunk_queue: order.into(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &str {
        self.parser.path()
    }

    /// Load the next chunk that yields at least one wanted message.
    fn load_next_chunk(&mut self) -> Result<bool> {
        while let Some(index) = self.chunk_queue.pop_front() {
            let chunk = &self.parser.chunks()[index];
            let data = self.parser.read_chunk(chunk)?;
            let messages: Vec<BagMessageData> = self
                .parser
                .parse_chunk_messages(&data)?
                .into_iter()
                .filter(|m| {
                    self.conn_topics.contains_key(&m.conn_id) && self.filter.contains_time(m.time)
                })
                .collect();

            if messages.is_empty() {
                continue;
            }

            self.pending = messages.into();
            return Ok(true);
        }
        Ok(false)
    }
}

impl Iterator for BagMessageReader {
    type Item = Result<RawMessage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.pending.is_empty() {
            match self.load_next_chunk() {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        let msg = self.pending.pop_front()?;
        let topic = self.conn_topics.get(&msg.conn_id)?.clone();
        Some(Ok(RawMessage {
            topic,
            data: msg.data,
            timestamp: msg.time,
        }))
    }
}
