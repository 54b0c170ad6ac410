// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod meta;
mod replay;
mod scan;

pub use meta::MetaCmd;
pub use replay::ReplayCmd;
pub use scan::ScanCmd;
