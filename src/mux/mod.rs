// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Chronological replay of a dataset.
//!
//! Subscriptions are resolved against the dataset's [`DatasetMetadata`](crate::meta::DatasetMetadata)
//! into channels, and [`Multiplex`] merges the messages of all files into
//! one globally ordered stream routed to those channels.
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagstitch::meta::aggregate;
//! use bagstitch::mux::{Multiplex, MuxEvent, MuxOptions, Subscription};
//! use bagstitch::scan::DatasetDescriptor;
//!
//! let dataset = DatasetDescriptor::from_files(&["run_2024-01-01-00-00-00_0.bag"])?;
//! let metadata = aggregate(&dataset)?;
//! let subs = [Subscription::parse("*:sensor_msgs/Imu")?];
//!
//! for event in Multiplex::open(&dataset, &metadata, &subs, &MuxOptions::default())? {
//!     if let MuxEvent::Message { channel, message } = event? {
//!         println!("{channel} {} {}", message.topic, message.timestamp);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod merge;
pub mod subscription;

pub use channel::{ChannelHeader, ChannelId, ChannelSink, MuxEvent, SubscriptionResolution};
pub use merge::{Multiplex, MuxOptions};
pub use subscription::Subscription;
