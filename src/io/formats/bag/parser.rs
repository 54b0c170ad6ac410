// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! ROS1 bag container parser.
//!
//! Reads the structural metadata of a bag without touching message
//! payloads:
//! 1. the bag header, to locate the index section
//! 2. connection records and chunk info records from the index section
//! 3. per-connection message counts and time bounds from the chunk infos
//!
//! Bags that were never closed properly have no index section. For those
//! the parser walks the chunk records and derives the same information
//! from the messages themselves.
//!
//! # BAG Format Structure (Version 2.0)
//!
//! ## File Header
//! - Magic: "#ROSBAG V2.0\n" (13 bytes)
//! - Followed by bag header record in standard record format
//!
//! ## Record Format
//! All records follow: `<header_len: u32><header><data_len: u32><data>`
//! where header contains `<field_len: u32><field_name>=<field_value>` pairs
//!
//! ## Op Codes
//! - 0x02: Message data
//! - 0x03: Bag header
//! - 0x04: Index data
//! - 0x05: Chunk
//! - 0x06: Chunk info
//! - 0x07: Connection

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{BagError, Result};

/// BAG op codes
const OP_MSG_DATA: u8 = 0x02;
const OP_BAG_HEADER: u8 = 0x03;
const OP_CHUNK: u8 = 0x05;
const OP_CHUNK_INFO: u8 = 0x06;
const OP_CONNECTION: u8 = 0x07;

/// Length of "#ROSBAG V2.0\n"
const MAGIC_LINE_LEN: u64 = 13;

/// BAG file header information.
#[derive(Debug, Clone)]
pub struct BagHeader {
    /// Version string (e.g., "2.0")
    pub version: String,
    /// Position of index section in file
    pub index_pos: u64,
    /// Number of connections in the file
    pub conn_count: u32,
    /// Number of chunks in the file
    pub chunk_count: u32,
}

impl BagHeader {
    /// Version as `major * 100 + minor` (200 for "2.0").
    pub fn version_number(&self) -> u32 {
        let mut parts = self.version.splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
        major * 100 + minor
    }
}

/// BAG chunk information.
#[derive(Debug, Clone)]
pub struct BagChunkInfo {
    /// Chunk sequence number
    pub sequence: u64,
    /// Offset of chunk record in file (position of header_len)
    pub chunk_pos: u64,
    /// Start time of messages in this chunk (ns)
    pub start_time: u64,
    /// End time of messages in this chunk (ns)
    pub end_time: u64,
    /// Messages per connection id in this chunk
    pub connection_counts: Vec<(u32, u32)>,
}

impl BagChunkInfo {
    /// Total number of messages in this chunk.
    pub fn message_count(&self) -> u64 {
        self.connection_counts
            .iter()
            .map(|&(_, count)| count as u64)
            .sum()
    }

    /// Whether any message of the given connections lives in this chunk.
    pub fn contains_any(&self, conn_ids: &std::collections::HashSet<u32>) -> bool {
        self.connection_counts
            .iter()
            .any(|(conn, count)| *count > 0 && conn_ids.contains(conn))
    }
}

/// BAG connection information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagConnection {
    /// Connection ID
    pub conn_id: u32,
    /// Topic name
    pub topic: String,
    /// Message type
    pub message_type: String,
    /// MD5 sum of message definition
    pub md5sum: String,
    /// Message definition (IDL-like text)
    pub message_definition: String,
    /// Caller ID (publishing node)
    pub caller_id: String,
    /// Raw `latching` header value, if present
    pub latching: Option<String>,
}

impl BagConnection {
    /// Interpret the `latching` header ("1" latched, "0" or absent not).
    pub fn is_latching(&self) -> Result<bool> {
        match self.latching.as_deref() {
            None | Some("0") => Ok(false),
            Some("1") => Ok(true),
            Some(other) => Err(BagError::parse(
                "BagConnection::is_latching",
                format!(
                    "Invalid latching value '{other}' on connection {} ('{}')",
                    self.conn_id, self.topic
                ),
            )),
        }
    }
}

/// Memory-mapped ROS1 bag parser.
pub struct BagParser {
    /// Path to the bag file
    path: String,
    /// File header information
    header: BagHeader,
    /// Chunk information in file order
    chunks: Vec<BagChunkInfo>,
    /// Connection information
    connections: HashMap<u32, BagConnection>,
    /// Memory-mapped file
    mmap: memmap2::Mmap,
    /// File size
    file_size: u64,
}

/// Parsed fields from a BAG record header
#[derive(Debug, Default)]
struct RecordHeader {
    op: Option<u8>,
    conn: Option<u32>,
    time: Option<u64>,
    topic: Option<String>,
    md5sum: Option<String>,
    message_type: Option<String>,
    message_definition: Option<String>,
    callerid: Option<String>,
    latching: Option<String>,
    index_pos: Option<u64>,
    conn_count: Option<u32>,
    chunk_count: Option<u32>,
    chunk_pos: Option<u64>,
    start_time: Option<u64>,
    end_time: Option<u64>,
    compression: Option<String>,
    size: Option<u32>,
    count: Option<u32>,
}

impl BagParser {
    /// BAG magic string
    const MAGIC: &'static [u8] = b"#ROSBAG V";

    /// Open a BAG file and parse its structural metadata.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let file = File::open(&path_str).map_err(|e| {
            BagError::io("BagParser::open", format!("Failed to open {path_str}: {e}"))
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| BagError::io("BagParser::open", format!("Failed to get metadata: {e}")))?
            .len();

        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| BagError::io("BagParser::open", format!("Failed to mmap file: {e}")))?;

        let mut cursor = Cursor::new(&mmap[..]);

        let version = Self::parse_magic(&mut cursor)?;
        if !version.starts_with("2.") {
            return Err(BagError::unsupported(format!(
                "bag format version {version} in {path_str}"
            )));
        }

        let header = Self::parse_bag_header_record(&mut cursor, version)?;

        let (chunks, connections) = if header.index_pos > 0 && header.index_pos < mmap.len() as u64
        {
            Self::parse_index_section(&mmap, &header)?
        } else {
            tracing::debug!(path = %path_str, "bag has no index section, scanning chunks");
            Self::scan_file_for_metadata(&mmap)?
        };

        Ok(Self {
            path: path_str,
            header,
            chunks,
            connections,
            mmap,
            file_size,
        })
    }

    /// Parse the BAG magic string and return version.
    fn parse_magic<R: Read>(reader: &mut R) -> Result<String> {
        let mut magic = [0u8; 9];
        reader.read_exact(&mut magic).map_err(|e| {
            BagError::parse("BagParser::parse_magic", format!("Failed to read magic: {e}"))
        })?;

        if magic != Self::MAGIC {
            return Err(BagError::parse(
                "BagParser::parse_magic",
                format!("Invalid BAG magic: {:?}", String::from_utf8_lossy(&magic)),
            ));
        }

        // Version line, e.g. "2.0\n"
        let mut version_buf = [0u8; 4];
        reader.read_exact(&mut version_buf).map_err(|e| {
            BagError::parse(
                "BagParser::parse_magic",
                format!("Failed to read version: {e}"),
            )
        })?;

        Ok(String::from_utf8_lossy(&version_buf).trim().to_string())
    }

    /// Parse the bag header record (first record after magic).
    fn parse_bag_header_record<R: Read>(reader: &mut R, version: String) -> Result<BagHeader> {
        let (header_fields, _data) = Self::read_record(reader)?;

        if header_fields.op != Some(OP_BAG_HEADER) {
            return Err(BagError::parse(
                "BagParser::parse_bag_header",
                format!(
                    "Expected bag header record (op=0x03), got op={:?}",
                    header_fields.op
                ),
            ));
        }

        Ok(BagHeader {
            version,
            index_pos: header_fields.index_pos.unwrap_or(0),
            conn_count: header_fields.conn_count.unwrap_or(0),
            chunk_count: header_fields.chunk_count.unwrap_or(0),
        })
    }

    /// Read a single BAG record: `<header_len: u32><header><data_len: u32><data>`
    fn read_record<R: Read>(reader: &mut R) -> Result<(RecordHeader, Vec<u8>)> {
        let header_len = reader.read_u32::<LittleEndian>().map_err(|e| {
            BagError::parse(
                "BagParser::read_record",
                format!("Failed to read header_len: {e}"),
            )
        })?;

        let mut header_bytes = vec![0u8; header_len as usize];
        reader.read_exact(&mut header_bytes).map_err(|e| {
            BagError::parse("BagParser::read_record", format!("Failed to read header: {e}"))
        })?;

        let header_fields = Self::parse_record_header(&header_bytes);

        let data_len = reader.read_u32::<LittleEndian>().map_err(|e| {
            BagError::parse(
                "BagParser::read_record",
                format!("Failed to read data_len: {e}"),
            )
        })?;

        let mut data = vec![0u8; data_len as usize];
        reader.read_exact(&mut data).map_err(|e| {
            BagError::parse("BagParser::read_record", format!("Failed to read data: {e}"))
        })?;

        Ok((header_fields, data))
    }

    /// Parse header bytes into named fields.
    /// Format: sequence of `<field_len: u32><field_name>=<field_value>`
    fn parse_record_header(header_bytes: &[u8]) -> RecordHeader {
        let mut cursor = Cursor::new(header_bytes);
        let mut fields = RecordHeader::default();

        while (cursor.position() as usize) < header_bytes.len() {
            let field_len = match cursor.read_u32::<LittleEndian>() {
                Ok(len) => len as usize,
                Err(_) => break,
            };

            if field_len == 0 {
                continue;
            }

            let mut field_bytes = vec![0u8; field_len];
            if cursor.read_exact(&mut field_bytes).is_err() {
                break;
            }

            if let Some(eq_pos) = field_bytes.iter().position(|&b| b == b'=') {
                let name = &field_bytes[..eq_pos];
                let value = &field_bytes[eq_pos + 1..];

                Self::parse_field(&mut fields, name, value);
            }
        }

        fields
    }

    /// Parse a single field from name and value bytes.
    fn parse_field(fields: &mut RecordHeader, name: &[u8], value: &[u8]) {
        match name {
            b"op" if value.len() == 1 => {
                fields.op = Some(value[0]);
            }
            b"conn" if value.len() >= 4 => {
                fields.conn = Some(read_u32_le(value));
            }
            b"time" if value.len() >= 8 => {
                fields.time = Some(read_time(value));
            }
            b"topic" => {
                fields.topic = Some(String::from_utf8_lossy(value).to_string());
            }
            b"md5sum" => {
                fields.md5sum = Some(String::from_utf8_lossy(value).to_string());
            }
            b"type" => {
                fields.message_type = Some(String::from_utf8_lossy(value).to_string());
            }
            b"message_definition" => {
                fields.message_definition = Some(String::from_utf8_lossy(value).to_string());
            }
            b"callerid" => {
                fields.callerid = Some(String::from_utf8_lossy(value).to_string());
            }
            b"latching" => {
                fields.latching = Some(String::from_utf8_lossy(value).to_string());
            }
            b"index_pos" if value.len() >= 8 => {
                fields.index_pos = Some(read_u64_le(value));
            }
            b"conn_count" if value.len() >= 4 => {
                fields.conn_count = Some(read_u32_le(value));
            }
            b"chunk_count" if value.len() >= 4 => {
                fields.chunk_count = Some(read_u32_le(value));
            }
            b"chunk_pos" if value.len() >= 8 => {
                fields.chunk_pos = Some(read_u64_le(value));
            }
            b"start_time" if value.len() >= 8 => {
                fields.start_time = Some(read_time(value));
            }
            b"end_time" if value.len() >= 8 => {
                fields.end_time = Some(read_time(value));
            }
            b"compression" => {
                fields.compression = Some(String::from_utf8_lossy(value).to_string());
            }
            b"size" if value.len() >= 4 => {
                fields.size = Some(read_u32_le(value));
            }
            b"count" if value.len() >= 4 => {
                fields.count = Some(read_u32_le(value));
            }
            _ => {}
        }
    }

    /// Parse the index section to get chunk info and connections.
    fn parse_index_section(
        mmap: &[u8],
        header: &BagHeader,
    ) -> Result<(Vec<BagChunkInfo>, HashMap<u32, BagConnection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(header.index_pos);

        let mut chunks = Vec::new();
        let mut connections = HashMap::new();
        let mut chunk_sequence: u64 = 0;

        while (cursor.position() as usize) < mmap.len() {
            let (header_fields, data) = match Self::read_record(&mut cursor) {
                Ok(r) => r,
                Err(_) => break,
            };

            match header_fields.op {
                Some(OP_CONNECTION) => {
                    let data_fields = Self::parse_record_header(&data);
                    if let Some(conn) = Self::connection_from_fields(&header_fields, &data_fields) {
                        connections.insert(conn.conn_id, conn);
                    }
                }
                Some(OP_CHUNK_INFO) => {
                    let chunk_info =
                        Self::chunk_info_from_fields(&header_fields, &data, chunk_sequence)?;
                    chunks.push(chunk_info);
                    chunk_sequence += 1;
                }
                _ => {}
            }
        }

        Ok((chunks, connections))
    }

    /// Create a BagConnection from parsed header and data fields.
    fn connection_from_fields(
        header_fields: &RecordHeader,
        data_fields: &RecordHeader,
    ) -> Option<BagConnection> {
        Some(BagConnection {
            conn_id: header_fields.conn?,
            topic: header_fields.topic.clone()?,
            // type, md5sum, message_definition come from the data section
            message_type: data_fields.message_type.clone()?,
            md5sum: data_fields.md5sum.clone().unwrap_or_default(),
            message_definition: data_fields.message_definition.clone().unwrap_or_default(),
            caller_id: data_fields.callerid.clone().unwrap_or_default(),
            latching: data_fields.latching.clone(),
        })
    }

    /// Create a BagChunkInfo from a chunk info record.
    ///
    /// The data section holds `count` pairs of `(conn: u32, count: u32)`.
    fn chunk_info_from_fields(
        fields: &RecordHeader,
        data: &[u8],
        sequence: u64,
    ) -> Result<BagChunkInfo> {
        let chunk_pos = fields.chunk_pos.ok_or_else(|| {
            BagError::parse("BagParser::chunk_info", "Chunk info record without chunk_pos")
        })?;

        let declared = fields.count.map(|c| c as usize).unwrap_or(data.len() / 8);
        if declared * 8 > data.len() {
            return Err(BagError::parse(
                "BagParser::chunk_info",
                format!(
                    "Chunk info declares {declared} connections but holds {} bytes",
                    data.len()
                ),
            ));
        }

        let mut cursor = Cursor::new(data);
        let mut connection_counts = Vec::with_capacity(declared);
        for _ in 0..declared {
            let conn = cursor.read_u32::<LittleEndian>()?;
            let count = cursor.read_u32::<LittleEndian>()?;
            connection_counts.push((conn, count));
        }

        Ok(BagChunkInfo {
            sequence,
            chunk_pos,
            start_time: fields.start_time.unwrap_or(0),
            end_time: fields.end_time.unwrap_or(0),
            connection_counts,
        })
    }

    /// Scan the file for metadata when no index section is available.
    fn scan_file_for_metadata(
        mmap: &[u8],
    ) -> Result<(Vec<BagChunkInfo>, HashMap<u32, BagConnection>)> {
        let mut cursor = Cursor::new(mmap);
        cursor.set_position(MAGIC_LINE_LEN);

        // Skip bag header record
        let _ = Self::read_record(&mut cursor)?;

        let mut chunks = Vec::new();
        let mut connections = HashMap::new();
        let mut chunk_sequence: u64 = 0;

        while (cursor.position() as usize) < mmap.len() {
            let record_start = cursor.position();

            let (header_fields, data) = match Self::read_record(&mut cursor) {
                Ok(r) => r,
                Err(_) => break,
            };

            match header_fields.op {
                Some(OP_CONNECTION) => {
                    let data_fields = Self::parse_record_header(&data);
                    if let Some(conn) = Self::connection_from_fields(&header_fields, &data_fields) {
                        connections.insert(conn.conn_id, conn);
                    }
                }
                Some(OP_CHUNK) => {
                    let decompressed = decompress(
                        header_fields.compression.as_deref().unwrap_or("none"),
                        header_fields.size,
                        data,
                    )?;

                    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
                    let mut start_time = u64::MAX;
                    let mut end_time = 0;
                    let mut inner = Cursor::new(&decompressed[..]);
                    while (inner.position() as usize) < decompressed.len() {
                        let (fields, record_data) = match Self::read_record(&mut inner) {
                            Ok(r) => r,
                            Err(_) => break,
                        };
                        match fields.op {
                            Some(OP_MSG_DATA) => {
                                if let Some(conn) = fields.conn {
                                    *counts.entry(conn).or_default() += 1;
                                    let time = fields.time.unwrap_or(0);
                                    start_time = start_time.min(time);
                                    end_time = end_time.max(time);
                                }
                            }
                            Some(OP_CONNECTION) => {
                                let data_fields = Self::parse_record_header(&record_data);
                                if let Some(conn) =
                                    Self::connection_from_fields(&fields, &data_fields)
                                {
                                    connections.entry(conn.conn_id).or_insert(conn);
                                }
                            }
                            _ => {}
                        }
                    }

                    if !counts.is_empty() {
                        chunks.push(BagChunkInfo {
                            sequence: chunk_sequence,
                            chunk_pos: record_start,
                            start_time,
                            end_time,
                            connection_counts: counts.into_iter().collect(),
                        });
                        chunk_sequence += 1;
                    }
                }
                _ => {}
            }
        }

        Ok((chunks, connections))
    }

    /// Get chunk information in file order.
    pub fn chunks(&self) -> &[BagChunkInfo] {
        &self.chunks
    }

    /// Get connections.
    pub fn connections(&self) -> &HashMap<u32, BagConnection> {
        &self.connections
    }

    /// Connections sorted by connection id.
    pub fn connections_sorted(&self) -> Vec<&BagConnection> {
        let mut conns: Vec<_> = self.connections.values().collect();
        conns.sort_by_key(|c| c.conn_id);
        conns
    }

    /// Message counts per connection id, summed over every chunk.
    ///
    /// Connections that appear in no chunk info are absent from the map.
    pub fn message_counts(&self) -> HashMap<u32, u64> {
        let mut counts: HashMap<u32, u64> = HashMap::new();
        for chunk in &self.chunks {
            for &(conn, count) in &chunk.connection_counts {
                *counts.entry(conn).or_default() += count as u64;
            }
        }
        counts
    }

    /// Earliest chunk start time (ns), if the bag holds any chunk.
    pub fn start_time(&self) -> Option<u64> {
        self.chunks.iter().map(|c| c.start_time).min()
    }

    /// Latest chunk end time (ns), if the bag holds any chunk.
    pub fn end_time(&self) -> Option<u64> {
        self.chunks.iter().map(|c| c.end_time).max()
    }

    /// Get the file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get header info.
    pub fn header(&self) -> &BagHeader {
        &self.header
    }

    /// Read and decompress a single chunk.
    pub fn read_chunk(&self, chunk_info: &BagChunkInfo) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.set_position(chunk_info.chunk_pos);

        let (header_fields, data) = Self::read_record(&mut cursor)?;

        if header_fields.op != Some(OP_CHUNK) {
            return Err(BagError::parse(
                "BagParser::read_chunk",
                format!(
                    "Expected chunk record (op=0x05), got op={:?}",
                    header_fields.op
                ),
            ));
        }

        decompress(
            header_fields.compression.as_deref().unwrap_or("none"),
            header_fields.size,
            data,
        )
    }

    /// Parse message data records from decompressed chunk data.
    pub fn parse_chunk_messages(&self, decompressed_data: &[u8]) -> Result<Vec<BagMessageData>> {
        let mut cursor = Cursor::new(decompressed_data);
        let mut messages = Vec::new();

        while (cursor.position() as usize) < decompressed_data.len() {
            let (header_fields, data) = Self::read_record(&mut cursor)?;

            if header_fields.op == Some(OP_MSG_DATA) {
                let conn_id = match header_fields.conn {
                    Some(id) => id,
                    None => continue,
                };

                messages.push(BagMessageData {
                    conn_id,
                    time: header_fields.time.unwrap_or(0),
                    data,
                });
            }
        }

        Ok(messages)
    }
}

/// Raw message record extracted from a BAG chunk.
#[derive(Debug)]
pub struct BagMessageData {
    /// Connection the message was recorded on
    pub conn_id: u32,
    /// Record timestamp (ns)
    pub time: u64,
    /// Serialized message bytes
    pub data: Vec<u8>,
}

/// Decompress chunk data according to its `compression` header.
///
/// `lz4` chunks are LZ4 frames (magic `04 22 4d 18`), as roslz4 writes them.
pub(crate) fn decompress(compression: &str, size: Option<u32>, data: Vec<u8>) -> Result<Vec<u8>> {
    match compression {
        "none" => Ok(data),
        "bz2" => {
            use bzip2::read::BzDecoder;
            let mut decoder = BzDecoder::new(&data[..]);
            let mut decompressed = Vec::new();
            if let Some(size) = size {
                decompressed.reserve(size as usize);
            }
            decoder.read_to_end(&mut decompressed).map_err(|e| {
                BagError::parse("BagParser::decompress", format!("BZ2 decompression failed: {e}"))
            })?;
            Ok(decompressed)
        }
        "lz4" => {
            let mut decoder = lz4_flex::frame::FrameDecoder::new(&data[..]);
            let mut decompressed = Vec::with_capacity(size.unwrap_or(0) as usize);
            decoder.read_to_end(&mut decompressed).map_err(|e| {
                BagError::parse("BagParser::decompress", format!("LZ4 decompression failed: {e}"))
            })?;
            Ok(decompressed)
        }
        other => Err(BagError::unsupported(format!(
            "chunk compression '{other}'"
        ))),
    }
}

fn read_u32_le(value: &[u8]) -> u32 {
    u32::from_le_bytes([value[0], value[1], value[2], value[3]])
}

fn read_u64_le(value: &[u8]) -> u64 {
    u64::from_le_bytes([
        value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7],
    ])
}

/// ROS time: sec (4 bytes) + nsec (4 bytes), as nanoseconds.
fn read_time(value: &[u8]) -> u64 {
    let sec = read_u32_le(&value[..4]) as u64;
    let nsec = read_u32_le(&value[4..8]) as u64;
    sec * 1_000_000_000 + nsec
}
