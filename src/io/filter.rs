// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Topic and time filtering for sequential bag reading.
//!
//! A [`MessageFilter`] is resolved against a bag's connection table once,
//! so that whole chunks can be skipped when none of their connections or
//! timestamps are wanted.

use std::collections::HashSet;

/// Filter for selecting topics during reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicFilter {
    /// Read all topics (no filtering)
    #[default]
    All,
    /// Read only specific topics
    Include(HashSet<String>),
}

impl TopicFilter {
    /// Check if a topic should be included.
    pub fn should_include(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Include(topics) => topics.contains(topic),
        }
    }

    /// Create an include filter from topic names.
    pub fn include<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(topics.into_iter().map(Into::into).collect())
    }
}

/// Topic and inclusive time-window filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    /// Topics to read
    pub topics: TopicFilter,
    /// Earliest timestamp to read (ns, inclusive)
    pub start_time: Option<u64>,
    /// Latest timestamp to read (ns, inclusive)
    pub end_time: Option<u64>,
}

impl MessageFilter {
    /// A filter that accepts everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to the given topics.
    pub fn with_topics(mut self, topics: TopicFilter) -> Self {
        self.topics = topics;
        self
    }

    /// Restrict to an inclusive time window.
    pub fn with_time_range(mut self, start_time: Option<u64>, end_time: Option<u64>) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Whether a timestamp falls inside the window.
    pub fn contains_time(&self, time: u64) -> bool {
        self.start_time.is_none_or(|s| time >= s) && self.end_time.is_none_or(|e| time <= e)
    }

    /// Whether the window intersects `[start, end]`.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start_time.is_none_or(|s| end >= s) && self.end_time.is_none_or(|e| start <= e)
    }
}
