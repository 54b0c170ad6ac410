// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core types used throughout bagstitch.
//!
//! - [`BagError`] - error and integrity-fault reporting
//! - [`Result`] - result alias

pub mod error;

pub use error::{BagError, Result};
