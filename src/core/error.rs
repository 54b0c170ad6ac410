// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Error types for bagstitch.
//!
//! Two families of failures live here:
//! - container errors (I/O, malformed records, unsupported compression)
//! - integrity faults, raised when the files of one dataset disagree with
//!   each other or with themselves. These always name the dataset and are
//!   never downgraded to warnings.

use std::fmt;

/// Errors that can occur while scanning, aggregating or replaying bags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagError {
    /// Malformed bag record or field
    ParseError {
        /// What was being parsed
        context: String,
        /// Error message
        message: String,
    },

    /// I/O failure while opening or mapping a file
    Io {
        /// Operation that failed
        context: String,
        /// Error message
        message: String,
    },

    /// Unsupported format feature
    Unsupported {
        /// What is not supported
        feature: String,
    },

    /// Subscription text could not be parsed
    InvalidSubscription {
        /// The subscription as given
        subscription: String,
        /// Why it was rejected
        reason: String,
    },

    /// A dataset was described without any file
    EmptyDataset {
        /// Dataset name
        dataset: String,
    },

    /// Configuration could not be loaded
    Config {
        /// Error message
        message: String,
    },

    /// A message type changed its md5sum or definition within a dataset
    TypeMismatch {
        /// Dataset name
        dataset: String,
        /// Message type name
        type_name: String,
        /// Field that differs ("md5sum" or "definition")
        field: &'static str,
        /// Value seen first
        expected: String,
        /// Conflicting value
        found: String,
    },

    /// A topic changed its message type or latching mode within a dataset
    TopicMismatch {
        /// Dataset name
        dataset: String,
        /// Topic name
        topic: String,
        /// Field that differs ("message_type" or "latching")
        field: &'static str,
        /// Value seen first
        expected: String,
        /// Conflicting value
        found: String,
    },

    /// A connection is declared but no chunk records a count for it
    MissingMessageCount {
        /// Dataset name
        dataset: String,
        /// File containing the connection
        path: String,
        /// Topic of the connection
        topic: String,
        /// Connection id
        conn_id: u32,
    },

    /// A bag holds no messages and therefore has no time bounds
    EmptyBag {
        /// Dataset name
        dataset: String,
        /// Offending file
        path: String,
    },

    /// The merged message sequence went backwards in time
    NonMonotonic {
        /// Dataset name
        dataset: String,
        /// File the offending message came from
        path: String,
        /// Topic of the offending message
        topic: String,
        /// Timestamp of the previous emission (ns)
        previous: u64,
        /// Timestamp of the offending message (ns)
        found: u64,
    },

    /// Other error
    Other(String),
}

impl BagError {
    /// Create a parse error.
    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        BagError::ParseError {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(context: impl Into<String>, message: impl Into<String>) -> Self {
        BagError::Io {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported feature error.
    pub fn unsupported(feature: impl Into<String>) -> Self {
        BagError::Unsupported {
            feature: feature.into(),
        }
    }

    /// Create an invalid subscription error.
    pub fn invalid_subscription(subscription: impl Into<String>, reason: impl Into<String>) -> Self {
        BagError::InvalidSubscription {
            subscription: subscription.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        BagError::Config {
            message: message.into(),
        }
    }

    /// Whether this error reports corrupt or inconsistent recorded data.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            BagError::TypeMismatch { .. }
                | BagError::TopicMismatch { .. }
                | BagError::MissingMessageCount { .. }
                | BagError::EmptyBag { .. }
                | BagError::NonMonotonic { .. }
        )
    }

    /// Dataset the error belongs to, for integrity faults.
    pub fn dataset(&self) -> Option<&str> {
        match self {
            BagError::TypeMismatch { dataset, .. }
            | BagError::TopicMismatch { dataset, .. }
            | BagError::MissingMessageCount { dataset, .. }
            | BagError::EmptyBag { dataset, .. }
            | BagError::NonMonotonic { dataset, .. } => Some(dataset),
            _ => None,
        }
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            BagError::ParseError { context, message } | BagError::Io { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            BagError::Unsupported { feature } => vec![("feature", feature.clone())],
            BagError::InvalidSubscription {
                subscription,
                reason,
            } => vec![
                ("subscription", subscription.clone()),
                ("reason", reason.clone()),
            ],
            BagError::EmptyDataset { dataset } => vec![("dataset", dataset.clone())],
            BagError::Config { message } => vec![("message", message.clone())],
            BagError::TypeMismatch {
                dataset,
                type_name,
                field,
                expected,
                found,
            } => vec![
                ("dataset", dataset.clone()),
                ("type", type_name.clone()),
                ("field", field.to_string()),
                ("expected", expected.clone()),
                ("found", found.clone()),
            ],
            BagError::TopicMismatch {
                dataset,
                topic,
                field,
                expected,
                found,
            } => vec![
                ("dataset", dataset.clone()),
                ("topic", topic.clone()),
                ("field", field.to_string()),
                ("expected", expected.clone()),
                ("found", found.clone()),
            ],
            BagError::MissingMessageCount {
                dataset,
                path,
                topic,
                conn_id,
            } => vec![
                ("dataset", dataset.clone()),
                ("path", path.clone()),
                ("topic", topic.clone()),
                ("conn", conn_id.to_string()),
            ],
            BagError::EmptyBag { dataset, path } => {
                vec![("dataset", dataset.clone()), ("path", path.clone())]
            }
            BagError::NonMonotonic {
                dataset,
                path,
                topic,
                previous,
                found,
            } => vec![
                ("dataset", dataset.clone()),
                ("path", path.clone()),
                ("topic", topic.clone()),
                ("previous", previous.to_string()),
                ("found", found.to_string()),
            ],
            BagError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BagError::ParseError { context, message } => {
                write!(f, "Parse error in {context}: {message}")
            }
            BagError::Io { context, message } => write!(f, "I/O error in {context}: {message}"),
            BagError::Unsupported { feature } => write!(f, "Unsupported feature: '{feature}'"),
            BagError::InvalidSubscription {
                subscription,
                reason,
            } => write!(f, "Invalid subscription '{subscription}': {reason}"),
            BagError::EmptyDataset { dataset } => write!(f, "Dataset '{dataset}' has no files"),
            BagError::Config { message } => write!(f, "Configuration error: {message}"),
            BagError::TypeMismatch {
                dataset,
                type_name,
                field,
                expected,
                found,
            } => write!(
                f,
                "Dataset '{dataset}': message type '{type_name}' changed {field} from '{expected}' to '{found}'"
            ),
            BagError::TopicMismatch {
                dataset,
                topic,
                field,
                expected,
                found,
            } => write!(
                f,
                "Dataset '{dataset}': topic '{topic}' changed {field} from '{expected}' to '{found}'"
            ),
            BagError::MissingMessageCount {
                dataset,
                path,
                topic,
                conn_id,
            } => write!(
                f,
                "Dataset '{dataset}': connection {conn_id} ('{topic}') in {path} has no message count"
            ),
            BagError::EmptyBag { dataset, path } => {
                write!(f, "Dataset '{dataset}': {path} contains no messages")
            }
            BagError::NonMonotonic {
                dataset,
                path,
                topic,
                previous,
                found,
            } => write!(
                f,
                "Dataset '{dataset}': message on '{topic}' from {path} at {found} ns precedes previous message at {previous} ns"
            ),
            BagError::Other(msg) => write!(f, "Other error: {msg}"),
        }
    }
}

impl std::error::Error for BagError {}

impl From<std::io::Error> for BagError {
    fn from(err: std::io::Error) -> Self {
        BagError::Io {
            context: "IO".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type for bagstitch operations.
pub type Result<T> = std::result::Result<T, BagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let err = BagError::parse("BagParser::read_record", "truncated header");
        assert_eq!(
            err.to_string(),
            "Parse error in BagParser::read_record: truncated header"
        );
        assert!(!err.is_integrity_fault());
        assert_eq!(err.dataset(), None);
    }

    #[test]
    fn test_type_mismatch_is_integrity_fault() {
        let err = BagError::TypeMismatch {
            dataset: "run1".to_string(),
            type_name: "std_msgs/String".to_string(),
            field: "md5sum",
            expected: "aaa".to_string(),
            found: "bbb".to_string(),
        };
        assert!(err.is_integrity_fault());
        assert_eq!(err.dataset(), Some("run1"));
        assert_eq!(
            err.to_string(),
            "Dataset 'run1': message type 'std_msgs/String' changed md5sum from 'aaa' to 'bbb'"
        );
    }

    #[test]
    fn test_non_monotonic_display() {
        let err = BagError::NonMonotonic {
            dataset: "run1".to_string(),
            path: "/data/run1_1.bag".to_string(),
            topic: "/imu".to_string(),
            previous: 20,
            found: 10,
        };
        assert!(err.is_integrity_fault());
        assert_eq!(
            err.to_string(),
            "Dataset 'run1': message on '/imu' from /data/run1_1.bag at 10 ns precedes previous message at 20 ns"
        );
    }

    #[test]
    fn test_log_fields_missing_count() {
        let err = BagError::MissingMessageCount {
            dataset: "d".to_string(),
            path: "a.bag".to_string(),
            topic: "/t".to_string(),
            conn_id: 3,
        };
        let fields = err.log_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], ("dataset", "d".to_string()));
        assert_eq!(fields[3], ("conn", "3".to_string()));
    }

    #[test]
    fn test_invalid_subscription_not_fault() {
        let err = BagError::invalid_subscription("a:b:c", "too many ':'");
        assert!(!err.is_integrity_fault());
        assert_eq!(err.to_string(), "Invalid subscription 'a:b:c': too many ':'");
    }

    #[test]
    fn test_empty_dataset_is_not_fault() {
        let err = BagError::EmptyDataset {
            dataset: "drive".to_string(),
        };
        assert!(!err.is_integrity_fault());
        assert_eq!(err.dataset(), None);
        assert_eq!(err.to_string(), "Dataset 'drive' has no files");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BagError = io_err.into();
        assert!(matches!(err, BagError::Io { .. }));
        assert_eq!(err.to_string(), "I/O error in IO: file not found");
    }
}
