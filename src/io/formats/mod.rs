// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File format implementations for robotics data.
//!
//! - [`bag`]: ROS1 bag format support

pub mod bag;
