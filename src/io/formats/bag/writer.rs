// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag v2.0 writer.
//!
//! Messages are buffered into chunks. A chunk is closed once its
//! uncompressed payload reaches the chunk threshold; it is then compressed
//! (`none`, `bz2` or `lz4` frames) and written together with one index
//! record per connection it holds. [`BagWriter::finish`] appends the
//! connection table and chunk infos and patches the bag header to point at
//! them. [`BagWriter::finish_unindexed`] skips that step and leaves
//! `index_pos` at zero, like a recorder that died mid-session.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use bagstitch::io::formats::bag::{BagMessage, BagWriter, Compression};
//!
//! let mut writer = BagWriter::create("output.bag")?.with_compression(Compression::Lz4);
//! let conn = writer.add_connection("/chatter", "std_msgs/String", "string data");
//! writer.write_message(&BagMessage::new(conn, 1_234_567_890, vec![0u8; 10]))?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{BagError, Result};

const MAGIC: &[u8] = b"#ROSBAG V2.0\n";

/// The bag header record is padded so that magic plus record fill this many bytes.
const BAG_HEADER_LEN: usize = 4096;

const OP_MSG_DATA: u8 = 0x02;
const OP_BAG_HEADER: u8 = 0x03;
const OP_INDEX_DATA: u8 = 0x04;
const OP_CHUNK: u8 = 0x05;
const OP_CHUNK_INFO: u8 = 0x06;
const OP_CONNECTION: u8 = 0x07;

const INDEX_VERSION: u32 = 1;
const CHUNK_INFO_VERSION: u32 = 1;

/// Default chunk threshold (768KB of uncompressed payload)
const DEFAULT_CHUNK_THRESHOLD: usize = 768 * 1024;

/// md5sum written when the caller does not supply one
const ZERO_MD5: &str = "00000000000000000000000000000000";

/// Chunk compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Bz2,
    /// LZ4 frame format, as written by roslz4
    Lz4,
}

impl Compression {
    /// Value of the chunk record's `compression` field.
    pub fn name(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bz2 => "bz2",
            Compression::Lz4 => "lz4",
        }
    }

    fn compress(self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Bz2 => {
                let mut encoder =
                    bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
                encoder.write_all(data)?;
                Ok(encoder.finish()?)
            }
            Compression::Lz4 => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
                encoder.write_all(data)?;
                encoder.finish().map_err(|e| {
                    BagError::io("BagWriter::compress", format!("LZ4 compression failed: {e}"))
                })
            }
        }
    }
}

/// A message to be written to a bag file.
#[derive(Debug, Clone)]
pub struct BagMessage {
    /// Connection ID returned by `add_connection`
    pub conn_id: u32,
    /// Timestamp in nanoseconds since Unix epoch
    pub time_ns: u64,
    /// Raw message data (ROS1 serialized bytes)
    pub data: Vec<u8>,
}

impl BagMessage {
    pub fn new(conn_id: u32, time_ns: u64, data: Vec<u8>) -> Self {
        Self {
            conn_id,
            time_ns,
            data,
        }
    }
}

/// Description of one connection to declare in a bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub topic: String,
    pub message_type: String,
    pub md5sum: String,
    pub message_definition: String,
    /// Publishing node; omitted from the record when empty
    pub callerid: String,
    pub latching: bool,
}

impl ConnectionSpec {
    /// Create a spec with a zero md5sum, no caller id and no latching.
    pub fn new(
        topic: impl Into<String>,
        message_type: impl Into<String>,
        message_definition: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            message_type: message_type.into(),
            md5sum: ZERO_MD5.to_string(),
            message_definition: message_definition.into(),
            callerid: String::new(),
            latching: false,
        }
    }

    pub fn with_md5sum(mut self, md5sum: impl Into<String>) -> Self {
        self.md5sum = md5sum.into();
        self
    }

    pub fn with_callerid(mut self, callerid: impl Into<String>) -> Self {
        self.callerid = callerid.into();
        self
    }

    pub fn with_latching(mut self, latching: bool) -> Self {
        self.latching = latching;
        self
    }
}

/// Encoded `name=value` header fields of one record.
#[derive(Debug, Default)]
struct Fields(Vec<u8>);

impl Fields {
    fn op(op: u8) -> Self {
        Self::default().bytes("op", &[op])
    }

    fn bytes(mut self, name: &str, value: &[u8]) -> Self {
        put_u32(&mut self.0, (name.len() + 1 + value.len()) as u32);
        self.0.extend_from_slice(name.as_bytes());
        self.0.push(b'=');
        self.0.extend_from_slice(value);
        self
    }

    fn u32(self, name: &str, value: u32) -> Self {
        self.bytes(name, &value.to_le_bytes())
    }

    fn u64(self, name: &str, value: u64) -> Self {
        self.bytes(name, &value.to_le_bytes())
    }

    fn time(self, name: &str, ns: u64) -> Self {
        let mut value = Vec::with_capacity(8);
        put_time(&mut value, ns);
        self.bytes(name, &value)
    }

    fn str(self, name: &str, value: &str) -> Self {
        self.bytes(name, value.as_bytes())
    }
}

/// Append `<header_len><header><data_len><data>`.
fn write_record(out: &mut Vec<u8>, header: &Fields, data: &[u8]) {
    put_u32(out, header.0.len() as u32);
    out.extend_from_slice(&header.0);
    put_u32(out, data.len() as u32);
    out.extend_from_slice(data);
}

fn write_connection(out: &mut Vec<u8>, id: u32, spec: &ConnectionSpec) {
    let mut data = Fields::default()
        .str("topic", &spec.topic)
        .str("type", &spec.message_type)
        .str("md5sum", &spec.md5sum)
        .str("message_definition", &spec.message_definition);
    if !spec.callerid.is_empty() {
        data = data.str("callerid", &spec.callerid);
    }
    data = data.str("latching", if spec.latching { "1" } else { "0" });

    let header = Fields::op(OP_CONNECTION).u32("conn", id).str("topic", &spec.topic);
    write_record(out, &header, &data.0);
}

/// Magic line plus the bag header record, padded with spaces to 4096 bytes.
fn bag_header(index_pos: u64, conn_count: u32, chunk_count: u32) -> Vec<u8> {
    let header = Fields::op(OP_BAG_HEADER)
        .u64("index_pos", index_pos)
        .u32("conn_count", conn_count)
        .u32("chunk_count", chunk_count);
    let padding = BAG_HEADER_LEN - MAGIC.len() - 4 - header.0.len() - 4;

    let mut out = Vec::with_capacity(BAG_HEADER_LEN);
    out.extend_from_slice(MAGIC);
    write_record(&mut out, &header, &vec![b' '; padding]);
    out
}

/// Chunk being filled.
#[derive(Debug)]
struct OpenChunk {
    data: Vec<u8>,
    start_time: u64,
    end_time: u64,
    counts: BTreeMap<u32, u32>,
    /// (time, offset into `data`) per connection
    index: BTreeMap<u32, Vec<(u64, u32)>>,
    /// Connections whose record already sits in `data`
    declared: BTreeSet<u32>,
}

impl OpenChunk {
    fn starting_at(time: u64) -> Self {
        Self {
            data: Vec::new(),
            start_time: time,
            end_time: time,
            counts: BTreeMap::new(),
            index: BTreeMap::new(),
            declared: BTreeSet::new(),
        }
    }
}

/// Chunk info kept for the summary section.
#[derive(Debug)]
struct ChunkSummary {
    pos: u64,
    start_time: u64,
    end_time: u64,
    counts: BTreeMap<u32, u32>,
}

/// ROS1 bag file writer.
///
/// Call [`finish`](BagWriter::finish) to write the index section; a writer
/// dropped without it leaves an unindexed bag behind.
pub struct BagWriter {
    out: BufWriter<File>,
    path: String,
    compression: Compression,
    chunk_threshold: usize,
    /// Declared connections; the id is the position
    connections: Vec<ConnectionSpec>,
    chunk: Option<OpenChunk>,
    summaries: Vec<ChunkSummary>,
    /// Bytes written so far
    file_pos: u64,
}

impl BagWriter {
    /// Create a new bag file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let file = File::create(&path).map_err(|e| {
            BagError::io("BagWriter::create", format!("Failed to create {path_str}: {e}"))
        })?;

        let mut out = BufWriter::new(file);
        let header = bag_header(0, 0, 0);
        out.write_all(&header)
            .map_err(|e| BagError::io("BagWriter::create", format!("Failed to write header: {e}")))?;

        Ok(Self {
            out,
            path: path_str,
            compression: Compression::None,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            connections: Vec::new(),
            chunk: None,
            summaries: Vec::new(),
            file_pos: header.len() as u64,
        })
    }

    /// Close chunks once they hold `bytes` of uncompressed records.
    pub fn with_chunk_threshold(mut self, bytes: usize) -> Self {
        self.chunk_threshold = bytes.max(1);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declare a connection with a zero md5sum and no latching.
    ///
    /// Returns the connection id to use in [`BagMessage`].
    pub fn add_connection(
        &mut self,
        topic: &str,
        message_type: &str,
        message_definition: &str,
    ) -> u32 {
        self.add_connection_spec(ConnectionSpec::new(topic, message_type, message_definition))
    }

    /// Declare a connection from a full spec.
    ///
    /// Several connections may share a topic; each gets its own id.
    pub fn add_connection_spec(&mut self, spec: ConnectionSpec) -> u32 {
        self.connections.push(spec);
        (self.connections.len() - 1) as u32
    }

    /// Append a message to the current chunk.
    pub fn write_message(&mut self, msg: &BagMessage) -> Result<()> {
        let spec = self.connections.get(msg.conn_id as usize).ok_or_else(|| {
            BagError::io(
                "BagWriter::write_message",
                format!(
                    "Unknown connection id {} ({} declared)",
                    msg.conn_id,
                    self.connections.len()
                ),
            )
        })?;

        let time = msg.time_ns;
        let chunk = self
            .chunk
            .get_or_insert_with(|| OpenChunk::starting_at(time));

        // A connection record precedes the first message of each connection in a chunk
        if chunk.declared.insert(msg.conn_id) {
            write_connection(&mut chunk.data, msg.conn_id, spec);
        }

        let offset = chunk.data.len() as u32;
        let header = Fields::op(OP_MSG_DATA).u32("conn", msg.conn_id).time("time", time);
        write_record(&mut chunk.data, &header, &msg.data);

        chunk.start_time = chunk.start_time.min(time);
        chunk.end_time = chunk.end_time.max(time);
        *chunk.counts.entry(msg.conn_id).or_default() += 1;
        chunk.index.entry(msg.conn_id).or_default().push((time, offset));

        if chunk.data.len() >= self.chunk_threshold {
            self.flush_chunk()?;
        }
        Ok(())
    }

    /// Compress and write the open chunk, followed by its index records.
    fn flush_chunk(&mut self) -> Result<()> {
        let Some(chunk) = self.chunk.take() else {
            return Ok(());
        };

        let payload = self.compression.compress(&chunk.data)?;
        let mut out = Vec::with_capacity(payload.len() + 64 * (chunk.index.len() + 1));

        let header = Fields::op(OP_CHUNK)
            .str("compression", self.compression.name())
            .u32("size", chunk.data.len() as u32);
        write_record(&mut out, &header, &payload);

        for (&conn, entries) in &chunk.index {
            let mut data = Vec::with_capacity(entries.len() * 12);
            for &(time, offset) in entries {
                put_time(&mut data, time);
                put_u32(&mut data, offset);
            }
            let header = Fields::op(OP_INDEX_DATA)
                .u32("ver", INDEX_VERSION)
                .u32("conn", conn)
                .u32("count", entries.len() as u32);
            write_record(&mut out, &header, &data);
        }

        self.out.write_all(&out).map_err(|e| {
            BagError::io("BagWriter::flush_chunk", format!("Failed to write chunk: {e}"))
        })?;

        tracing::trace!(
            path = %self.path,
            pos = self.file_pos,
            compression = self.compression.name(),
            size = chunk.data.len(),
            stored = payload.len(),
            "Chunk written"
        );

        self.summaries.push(ChunkSummary {
            pos: self.file_pos,
            start_time: chunk.start_time,
            end_time: chunk.end_time,
            counts: chunk.counts,
        });
        self.file_pos += out.len() as u64;
        Ok(())
    }

    /// Flush the last chunk, write the index section and patch the header.
    pub fn finish(self) -> Result<()> {
        self.close(true)
    }

    /// Flush the last chunk and stop, leaving `index_pos` at zero.
    pub fn finish_unindexed(self) -> Result<()> {
        self.close(false)
    }

    fn close(mut self, write_index: bool) -> Result<()> {
        self.flush_chunk()?;

        if write_index {
            let index_pos = self.file_pos;
            let mut out = Vec::new();

            for (id, spec) in self.connections.iter().enumerate() {
                write_connection(&mut out, id as u32, spec);
            }

            for summary in &self.summaries {
                let mut data = Vec::with_capacity(summary.counts.len() * 8);
                for (&conn, &count) in &summary.counts {
                    put_u32(&mut data, conn);
                    put_u32(&mut data, count);
                }
                let header = Fields::op(OP_CHUNK_INFO)
                    .u32("ver", CHUNK_INFO_VERSION)
                    .u64("chunk_pos", summary.pos)
                    .time("start_time", summary.start_time)
                    .time("end_time", summary.end_time)
                    .u32("count", summary.counts.len() as u32);
                write_record(&mut out, &header, &data);
            }

            let header = bag_header(
                index_pos,
                self.connections.len() as u32,
                self.summaries.len() as u32,
            );
            self.out
                .write_all(&out)
                .and_then(|_| self.out.seek(SeekFrom::Start(0)))
                .and_then(|_| self.out.write_all(&header))
                .map_err(|e| {
                    BagError::io("BagWriter::finish", format!("Failed to write index: {e}"))
                })?;
        }

        self.out
            .flush()
            .map_err(|e| BagError::io("BagWriter::finish", format!("Failed to flush: {e}")))
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// ROS time: u32 seconds then u32 nanoseconds.
fn put_time(out: &mut Vec<u8>, ns: u64) {
    put_u32(out, (ns / 1_000_000_000) as u32);
    put_u32(out, (ns % 1_000_000_000) as u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_time() {
        let mut out = Vec::new();
        put_time(&mut out, 1_500_000_000);
        assert_eq!(out, [1, 0, 0, 0, 0x00, 0x65, 0xcd, 0x1d]);
    }

    #[test]
    fn test_fields_encoding() {
        let fields = Fields::op(OP_CHUNK).str("compression", "lz4");
        assert_eq!(&fields.0[..4], &4u32.to_le_bytes());
        assert_eq!(&fields.0[4..8], b"op=\x05");
        assert_eq!(&fields.0[8..12], &15u32.to_le_bytes());
        assert_eq!(&fields.0[12..], b"compression=lz4");
    }

    #[test]
    fn test_bag_header_is_4096_bytes() {
        let header = bag_header(123_456, 3, 7);
        assert_eq!(header.len(), BAG_HEADER_LEN);
        assert!(header.starts_with(MAGIC));
        assert_eq!(bag_header(0, 0, 0).len(), BAG_HEADER_LEN);
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(Compression::default(), Compression::None);
        assert_eq!(Compression::None.name(), "none");
        assert_eq!(Compression::Bz2.name(), "bz2");
        assert_eq!(Compression::Lz4.name(), "lz4");
    }

    #[test]
    fn test_lz4_chunks_are_frames() {
        let stored = Compression::Lz4.compress(b"some chunk payload").unwrap();
        assert_eq!(stored[..4], [0x04, 0x22, 0x4d, 0x18]);
        let stored = Compression::Bz2.compress(b"some chunk payload").unwrap();
        assert!(stored.starts_with(b"BZh"));
    }

    #[test]
    fn test_connection_spec_builder() {
        let spec = ConnectionSpec::new("/tf_static", "tf2_msgs/TFMessage", "def")
            .with_md5sum("94810edda583a504dfda3829e70d7eec")
            .with_latching(true)
            .with_callerid("/broadcaster");
        assert_eq!(spec.md5sum, "94810edda583a504dfda3829e70d7eec");
        assert!(spec.latching);
        assert_eq!(spec.callerid, "/broadcaster");
        assert_eq!(ConnectionSpec::new("/a", "T", "").md5sum, ZERO_MD5);
    }
}
