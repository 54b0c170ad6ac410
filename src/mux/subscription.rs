// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Subscription parsing and resolution.
//!
//! A subscription is either an exact topic name (`/imu/data`) or a
//! `topic:type` pattern pair where either side may contain `*`
//! (`*:sensor_msgs/Imu`, `/camera/*:*`). Patterns are compiled to anchored
//! regexes once, at parse time.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::meta::{DatasetMetadata, TopicDescriptor};
use crate::{BagError, Result};

/// A wildcard pattern matched against a whole name.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn new(subscription: &str, source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(BagError::invalid_subscription(
                subscription,
                "empty pattern on one side of ':'",
            ));
        }

        let literals: Vec<String> = source.split('*').map(regex::escape).collect();
        let regex_pattern = format!("^{}$", literals.join(".*"));

        let regex = Regex::new(&regex_pattern)
            .map_err(|e| BagError::invalid_subscription(subscription, e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// What a consumer asks the multiplexer for.
#[derive(Debug, Clone)]
pub enum Subscription {
    /// One topic by exact name
    Topic(String),
    /// Every topic whose name and message type match
    Pattern {
        /// Topic name pattern
        topic: Pattern,
        /// Message type pattern
        message_type: Pattern,
    },
}

impl Subscription {
    /// Parse a subscription string.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(BagError::invalid_subscription(text, "empty subscription"));
        }

        let mut parts = text.split(':');
        let topic = parts.next().unwrap_or_default();
        let Some(message_type) = parts.next() else {
            return Ok(Self::Topic(text.to_string()));
        };
        if parts.next().is_some() {
            return Err(BagError::invalid_subscription(
                text,
                "expected at most one ':' separating topic and type",
            ));
        }

        Ok(Self::Pattern {
            topic: Pattern::new(text, topic)?,
            message_type: Pattern::new(text, message_type)?,
        })
    }

    /// Whether this subscription may match more than one topic.
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern { .. })
    }

    /// Whether a topic satisfies this subscription.
    pub fn matches(&self, topic: &TopicDescriptor) -> bool {
        match self {
            Self::Topic(name) => *name == topic.name,
            Self::Pattern {
                topic: topic_pattern,
                message_type,
            } => topic_pattern.matches(&topic.name) && message_type.matches(&topic.message_type),
        }
    }

    /// Topics of `metadata` this subscription selects, in topic name order.
    ///
    /// An exact-name subscription selects at most one topic. Selecting none
    /// is not an error.
    pub fn resolve<'a>(&self, metadata: &'a DatasetMetadata) -> Vec<&'a TopicDescriptor> {
        match self {
            Self::Topic(name) => metadata.topic(name).into_iter().collect(),
            Self::Pattern { .. } => metadata
                .topics
                .values()
                .filter(|t| self.matches(t))
                .collect(),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topic(name) => write!(f, "{name}"),
            Self::Pattern {
                topic,
                message_type,
            } => write!(f, "{}:{}", topic.source, message_type.source),
        }
    }
}

impl FromStr for Subscription {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn metadata(topics: &[(&str, &str)]) -> DatasetMetadata {
        let topics: BTreeMap<String, TopicDescriptor> = topics
            .iter()
            .map(|(name, ty)| {
                (
                    name.to_string(),
                    TopicDescriptor {
                        name: name.to_string(),
                        message_count: 1,
                        message_type: ty.to_string(),
                        latching: false,
                    },
                )
            })
            .collect();
        DatasetMetadata {
            name: "ds".to_string(),
            start_time: 0,
            end_time: 0,
            duration: 0,
            message_count: topics.len() as u64,
            message_types: BTreeMap::new(),
            topics,
            files: Vec::new(),
        }
    }

    fn names(topics: Vec<&TopicDescriptor>) -> Vec<&str> {
        topics.into_iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_parse_exact() {
        let sub = Subscription::parse("/imu/data").unwrap();
        assert!(!sub.is_pattern());
        assert_eq!(sub.to_string(), "/imu/data");
    }

    #[test]
    fn test_parse_pattern() {
        let sub: Subscription = "*:sensor_msgs/Imu".parse().unwrap();
        assert!(sub.is_pattern());
        assert_eq!(sub.to_string(), "*:sensor_msgs/Imu");
    }

    #[test]
    fn test_parse_rejects_extra_colon() {
        let err = Subscription::parse("a:b:c").unwrap_err();
        assert!(matches!(err, BagError::InvalidSubscription { .. }));
        assert!(Subscription::parse("").is_err());
        assert!(Subscription::parse("/a:").is_err());
    }

    #[test]
    fn test_type_wildcard_resolution() {
        let meta = metadata(&[("/a", "TypeX"), ("/b", "TypeY")]);
        let sub = Subscription::parse("*:TypeX").unwrap();
        assert_eq!(names(sub.resolve(&meta)), vec!["/a"]);
    }

    #[test]
    fn test_wildcard_resolves_in_name_order() {
        let meta = metadata(&[("/z", "T"), ("/a", "T"), ("/m", "U")]);
        let sub = Subscription::parse("*:*").unwrap();
        assert_eq!(names(sub.resolve(&meta)), vec!["/a", "/m", "/z"]);
    }

    #[test]
    fn test_prefix_wildcard() {
        let meta = metadata(&[
            ("/camera/left", "Image"),
            ("/camera/right", "Image"),
            ("/imu", "Imu"),
        ]);
        let sub = Subscription::parse("/camera/*:*").unwrap();
        assert_eq!(names(sub.resolve(&meta)), vec!["/camera/left", "/camera/right"]);
    }

    #[test]
    fn test_exact_resolves_at_most_one() {
        let meta = metadata(&[("/a", "T")]);
        assert_eq!(names(Subscription::parse("/a").unwrap().resolve(&meta)), vec!["/a"]);
        assert!(Subscription::parse("/missing").unwrap().resolve(&meta).is_empty());
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let meta = metadata(&[("/a.b", "T"), ("/axb", "T")]);
        let sub = Subscription::parse("/a.b:*").unwrap();
        assert_eq!(names(sub.resolve(&meta)), vec!["/a.b"]);
    }

    #[test]
    fn test_every_non_star_character_is_literal() {
        let meta = metadata(&[
            ("/c++/(raw)", "pkg/A[1]"),
            ("/cc/raw", "pkg/A1"),
            ("/c++/(raw)/x", "pkg/A{1}|B"),
        ]);
        let sub = Subscription::parse("/c++/(raw)*:pkg/A*").unwrap();
        assert_eq!(
            names(sub.resolve(&meta)),
            vec!["/c++/(raw)", "/c++/(raw)/x"]
        );

        let sub = Subscription::parse("*:pkg/A{1}|B").unwrap();
        assert_eq!(names(sub.resolve(&meta)), vec!["/c++/(raw)/x"]);

        let sub = Subscription::parse("/c?+/*:*").unwrap();
        assert!(sub.resolve(&meta).is_empty());
    }
}
