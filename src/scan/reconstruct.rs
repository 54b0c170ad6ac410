// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Dataset reconstruction from a directory listing.
//!
//! The listing is sorted, then walked newest-first (reverse lexicographic
//! order), so a
//! split sequence is met from its highest index down to index 0. A sequence
//! closes when index 0 (or a name without index) is reached; anything left
//! open, or broken by a gap, is an orphan.

use std::path::{Path, PathBuf};

use super::classify::{classify, FileToken};
use super::{DatasetDescriptor, OrphanPolicy, ScanOptions, ScanReport};

/// Group a directory listing into datasets.
///
/// `filenames` is the listing of `dir` in any order; the result depends only
/// on the set of names. Names not ending in `.bag` are ignored. No file is
/// opened.
pub fn reconstruct<S: AsRef<str>>(
    dir: &Path,
    filenames: &[S],
    options: &ScanOptions,
) -> ScanReport {
    let mut names: Vec<&str> = filenames.iter().map(|name| name.as_ref()).collect();
    names.sort_unstable();

    let tokens: Vec<FileToken> = names
        .into_iter()
        .rev()
        .filter_map(|name| classify(name, options.naming))
        .collect();

    let mut out = Collector::new(dir, options.orphans);

    for group in tokens.chunk_by(|a, b| a.base_name == b.base_name) {
        let mut candidate: Vec<&FileToken> = Vec::new();
        let mut prev: Option<u64> = None;

        for token in group {
            let continues = match prev {
                None => true,
                Some(p) => token.index.is_some() && p.checked_sub(1) == token.index,
            };
            let same_shape = candidate
                .last()
                .is_none_or(|last| last.timestamp.is_some() == token.timestamp.is_some());

            if !continues || !same_shape {
                out.discard(&mut candidate);
            }

            candidate.push(token);
            prev = token.index;

            if matches!(token.index, None | Some(0)) {
                out.emit(&token.base_name, &mut candidate);
            }
        }

        out.discard(&mut candidate);
    }

    out.finish()
}

/// Accumulates results in discovery (descending) order.
struct Collector<'a> {
    dir: &'a Path,
    policy: OrphanPolicy,
    datasets: Vec<DatasetDescriptor>,
    orphans: Vec<PathBuf>,
}

impl<'a> Collector<'a> {
    fn new(dir: &'a Path, policy: OrphanPolicy) -> Self {
        Self {
            dir,
            policy,
            datasets: Vec::new(),
            orphans: Vec::new(),
        }
    }

    fn emit(&mut self, name: &str, candidate: &mut Vec<&FileToken>) {
        let files = candidate
            .drain(..)
            .rev()
            .map(|t| self.dir.join(&t.filename))
            .collect();
        self.datasets.push(DatasetDescriptor {
            name: name.to_string(),
            files,
        });
    }

    fn discard(&mut self, candidate: &mut Vec<&FileToken>) {
        for token in candidate.drain(..) {
            let path = self.dir.join(&token.filename);
            match self.policy {
                OrphanPolicy::Report => self.orphans.push(path),
                OrphanPolicy::Promote => {
                    tracing::debug!(path = %path.display(), "promoting orphaned bag");
                    self.datasets.push(DatasetDescriptor {
                        name: token.stem().to_string(),
                        files: vec![path],
                    });
                }
            }
        }
    }

    fn finish(mut self) -> ScanReport {
        self.datasets.reverse();
        self.orphans.sort();
        for orphan in &self.orphans {
            tracing::warn!(path = %orphan.display(), "orphaned bag");
        }
        ScanReport {
            datasets: self.datasets,
            orphans: self.orphans,
        }
    }
}
