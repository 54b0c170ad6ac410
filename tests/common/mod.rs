// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Common utilities for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bagstitch::io::formats::bag::{BagMessage, BagWriter, Compression, ConnectionSpec};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Cleanup guard for test temporary directories
#[derive(Debug)]
pub struct CleanupGuard(pub PathBuf);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Create a fresh, empty temporary directory for one test.
pub fn temp_dir(name: &str) -> (PathBuf, CleanupGuard) {
    let dir = std::env::temp_dir().join(format!(
        "bagstitch_{}_{}_{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create temp dir");
    let guard = CleanupGuard(dir.clone());
    (dir, guard)
}

/// Create empty files with the given names.
pub fn touch_all(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"").expect("touch file");
    }
}

/// A message to write: connection index into the fixture's connection list,
/// timestamp in nanoseconds and payload.
#[derive(Debug, Clone)]
pub struct Msg {
    pub conn: usize,
    pub time: u64,
    pub data: Vec<u8>,
}

/// Message whose payload is its own timestamp, tagged with `tag`.
pub fn msg(conn: usize, time: u64, tag: u8) -> Msg {
    let mut data = vec![tag];
    data.extend_from_slice(&time.to_le_bytes());
    Msg { conn, time, data }
}

/// How to finish a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Indexed,
    Unindexed,
}

/// Write a bag with the given connections and messages.
pub fn write_bag_with(
    path: &Path,
    connections: &[ConnectionSpec],
    messages: &[Msg],
    chunk_threshold: Option<usize>,
    finish: Finish,
) -> PathBuf {
    write_compressed(path, connections, messages, Compression::None, chunk_threshold, finish)
}

/// Write a bag whose chunks use `compression`.
pub fn write_compressed(
    path: &Path,
    connections: &[ConnectionSpec],
    messages: &[Msg],
    compression: Compression,
    chunk_threshold: Option<usize>,
    finish: Finish,
) -> PathBuf {
    let mut writer = BagWriter::create(path)
        .expect("create bag")
        .with_compression(compression);
    if let Some(threshold) = chunk_threshold {
        writer = writer.with_chunk_threshold(threshold);
    }

    let ids: Vec<u32> = connections
        .iter()
        .map(|c| writer.add_connection_spec(c.clone()))
        .collect();

    for m in messages {
        writer
            .write_message(&BagMessage::new(ids[m.conn], m.time, m.data.clone()))
            .expect("write message");
    }

    match finish {
        Finish::Indexed => writer.finish().expect("finish bag"),
        Finish::Unindexed => writer.finish_unindexed().expect("finish bag"),
    }
    path.to_path_buf()
}

/// Write an indexed bag in a single chunk.
pub fn write_bag(path: &Path, connections: &[ConnectionSpec], messages: &[Msg]) -> PathBuf {
    write_bag_with(path, connections, messages, None, Finish::Indexed)
}

/// Connection spec with a fixed md5sum per type name.
pub fn conn(topic: &str, message_type: &str) -> ConnectionSpec {
    ConnectionSpec::new(topic, message_type, format!("# {message_type}\nint32 value"))
        .with_md5sum(format!("{:0>32}", message_type.len()))
}

/// Messages `times` on connection 0.
pub fn series(times: &[u64], tag: u8) -> Vec<Msg> {
    times.iter().map(|&t| msg(0, t, tag)).collect()
}

/// Write an indexed bag declaring only the connections that carry messages.
pub fn write_used(path: &Path, connections: &[ConnectionSpec], messages: &[Msg]) -> PathBuf {
    let used: Vec<usize> = (0..connections.len())
        .filter(|i| messages.iter().any(|m| m.conn == *i))
        .collect();
    let specs: Vec<ConnectionSpec> = used.iter().map(|&i| connections[i].clone()).collect();
    let remapped: Vec<Msg> = messages
        .iter()
        .map(|m| Msg {
            conn: used.iter().position(|&u| u == m.conn).unwrap_or(0),
            ..m.clone()
        })
        .collect();
    write_bag(path, &specs, &remapped)
}
