//! Sorted String Table (SSTable) implementation
//!
//! SSTables are immutable artifacts that store sorted key-value pairs. They
//! are the persistent storage format produced by the sequence allocator (and,
//! in the wider system, by the LSM flush/compaction path that lives outside
//! this crate) and are organized as a contiguous entries region followed by
//! an index region.
//!
//! # Binary Format Specification
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ format:u8 │ index_offset:u32 │ num_entries:u32 │ ...      │  header, 25 bytes
//! ├──────────────────────────────────────────────────────────┤
//! │                      Entries region                      │  data[0..index_offset)
//! ├──────────────────────────────────────────────────────────┤
//! │                       Index region                       │  data[index_offset..)
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry format (within the entries region)
//!
//! ```text
//! ┌────────────┬───────────┬──────────────────────┬───────────┐
//! │ key_len:u32│    key    │ value_len:u32 | TOMB  │   value?  │
//! └────────────┴───────────┴──────────────────────┴───────────┘
//! ```
//!
//! A value length of [`TOMBSTONE_SENTINEL`] marks a tombstone: the value is
//! absent rather than empty, and no value bytes follow.
//!
//! ## Index entry format (within the index region)
//!
//! One index entry is written per data entry, in the same order, so the
//! index can be binary-searched directly for seek support.
//!
//! ```text
//! ┌────────────┬───────────┬─────────────┐
//! │ key_len:u32│    key    │ offset:u32  │
//! └────────────┴───────────┴─────────────┘
//! ```
//!
//! # Key invariants
//!
//! 1. Entries are sorted by key, ascending, unsigned lexicographic.
//! 2. Keys are unique within a table.
//! 3. All multi-byte integers are big-endian.
//! 4. `deserialize(serialize(t))` reproduces every observable field of `t`.
//! 5. SSTables are immutable after [`build_sstable`] returns.

use crate::encoding::{read_length_prefixed, write_length_prefixed};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use embertide_core::{DataFormat, Error, Key, Result, SSTableId, Value, KV};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

pub mod reader;
pub mod writer;

pub use reader::SSTableIterator;
pub use writer::{build_sstable, KvIterator, KvSliceIterator};

/// Fixed header size in bytes: `format(1) + index_offset(4) + num_entries(4)
/// + num_deletes(4) + max_key_length(4) + creation_time(8)`.
pub const HEADER_SIZE: usize = 1 + 4 + 4 + 4 + 4 + 8;

/// Value-length sentinel marking a tombstone entry.
pub const TOMBSTONE_SENTINEL: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub(crate) struct IndexEntry {
    pub key: Key,
    pub offset: u32,
}

struct SSTableInner {
    format: DataFormat,
    data: Vec<u8>,
    index_offset: u32,
    num_entries: u32,
    num_deletes: u32,
    max_key_length: u32,
    creation_time: u64,
    index: Vec<IndexEntry>,
}

/// An immutable, sorted, block-indexed table of key-value records.
///
/// Cheap to clone: internally reference-counted, so multiple iterators (or
/// multiple owners, e.g. a cache and an in-flight read) can share one
/// in-memory copy of the underlying bytes without coordination.
#[derive(Clone)]
pub struct SSTable {
    inner: Arc<SSTableInner>,
}

impl SSTable {
    /// The on-disk format version this table was built with.
    pub fn format(&self) -> DataFormat {
        self.inner.format
    }

    /// Number of entries (live and tombstone) stored in this table.
    pub fn num_entries(&self) -> usize {
        self.inner.num_entries as usize
    }

    /// Number of tombstone entries stored in this table.
    pub fn num_deletes(&self) -> usize {
        self.inner.num_deletes as usize
    }

    /// Wall-clock milliseconds-since-epoch at the time this table was built.
    pub fn creation_time(&self) -> u64 {
        self.inner.creation_time
    }

    /// Byte offset within `data` where the index region begins.
    pub fn index_offset(&self) -> u32 {
        self.inner.index_offset
    }

    /// Maximum key length observed among this table's entries.
    pub fn max_key_length(&self) -> u32 {
        self.inner.max_key_length
    }

    /// The raw entries+index byte region (observable for round-trip tests).
    pub fn data(&self) -> &[u8] {
        &self.inner.data
    }

    /// Serializes this table to its on-disk byte representation.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.inner.data.len());
        out.push(self.inner.format.as_u8());
        out.write_u32::<BigEndian>(self.inner.index_offset).unwrap();
        out.write_u32::<BigEndian>(self.inner.num_entries).unwrap();
        out.write_u32::<BigEndian>(self.inner.num_deletes).unwrap();
        out.write_u32::<BigEndian>(self.inner.max_key_length)
            .unwrap();
        out.write_u64::<BigEndian>(self.inner.creation_time)
            .unwrap();
        out.extend_from_slice(&self.inner.data);
        out
    }

    /// Restores a table from its serialized form starting at `offset`.
    ///
    /// Returns the table along with the offset just past the consumed bytes
    /// (always `buf.len()`, since the data region runs to the end of the
    /// buffer with no trailing length field).
    pub fn deserialize(buf: &[u8], offset: usize) -> Result<(SSTable, usize)> {
        if buf.len() < offset + HEADER_SIZE {
            return Err(Error::Corruption("truncated SSTable header".to_string()));
        }
        let format = DataFormat::from_u8(buf[offset])
            .ok_or_else(|| Error::Corruption("unknown SSTable format tag".to_string()))?;
        let mut cursor = Cursor::new(&buf[offset + 1..offset + HEADER_SIZE]);
        let index_offset = cursor.read_u32::<BigEndian>()?;
        let num_entries = cursor.read_u32::<BigEndian>()?;
        let num_deletes = cursor.read_u32::<BigEndian>()?;
        let max_key_length = cursor.read_u32::<BigEndian>()?;
        let creation_time = cursor.read_u64::<BigEndian>()?;

        let data = buf[offset + HEADER_SIZE..].to_vec();
        let index = parse_index(&data, index_offset as usize, num_entries as usize)?;

        let table = SSTable {
            inner: Arc::new(SSTableInner {
                format,
                data,
                index_offset,
                num_entries,
                num_deletes,
                max_key_length,
                creation_time,
                index,
            }),
        };
        Ok((table, buf.len()))
    }

    /// Returns an iterator over `[start_key, end_key)`.
    ///
    /// `start_key = None` means "from the beginning"; `end_key = None` means
    /// "to the end". See the module docs for seek semantics at a missing
    /// exact match.
    pub fn new_iterator(
        &self,
        start_key: Option<&[u8]>,
        end_key: Option<&[u8]>,
    ) -> Result<SSTableIterator> {
        let pos = match start_key {
            None => 0,
            Some(k) => self.inner.index.partition_point(|e| e.key.as_slice() < k),
        };
        let mut iter = SSTableIterator::new(self.clone(), pos, end_key.map(|k| k.to_vec()));
        iter.load_current();
        Ok(iter)
    }
}

fn parse_index(data: &[u8], index_offset: usize, num_entries: usize) -> Result<Vec<IndexEntry>> {
    let mut out = Vec::with_capacity(num_entries);
    let mut pos = index_offset;
    for _ in 0..num_entries {
        let (key, next) = read_length_prefixed(data, pos)?;
        if next + 4 > data.len() {
            return Err(Error::Corruption(
                "truncated index entry offset".to_string(),
            ));
        }
        let offset = Cursor::new(&data[next..next + 4]).read_u32::<BigEndian>()?;
        out.push(IndexEntry { key, offset });
        pos = next + 4;
    }
    Ok(out)
}

pub(crate) fn write_index_entry(buf: &mut Vec<u8>, entry: &IndexEntry) {
    write_length_prefixed(buf, &entry.key);
    buf.write_u32::<BigEndian>(entry.offset).unwrap();
}

pub(crate) fn decode_entry_at(data: &[u8], offset: usize) -> Result<KV> {
    let (key, next) = read_length_prefixed(data, offset)?;
    if next + 4 > data.len() {
        return Err(Error::Corruption(
            "truncated entry value marker".to_string(),
        ));
    }
    let marker = Cursor::new(&data[next..next + 4]).read_u32::<BigEndian>()?;
    if marker == TOMBSTONE_SENTINEL {
        Ok(KV::tombstone(key))
    } else {
        let value_len = marker as usize;
        let start = next + 4;
        let end = start
            .checked_add(value_len)
            .ok_or_else(|| Error::Corruption("entry value length overflow".to_string()))?;
        if end > data.len() {
            return Err(Error::Corruption(
                "entry value exceeds data region".to_string(),
            ));
        }
        let value: Value = data[start..end].to_vec();
        Ok(KV::new(key, value))
    }
}

/// Mints a fresh, globally unique [`SSTableId`] for a table about to be
/// written to object storage.
pub fn create_sstable_id() -> SSTableId {
    Uuid::new_v4().to_string()
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embertide_core::DataFormat;

    fn key(i: usize) -> Key {
        format!("keyprefix/somekey-{i:010}").into_bytes()
    }
    fn value(i: usize) -> Value {
        format!("valueprefix/somevalue-{i:010}").into_bytes()
    }

    #[test]
    fn build_table_with_tombstones_counts_entries() {
        let num_entries = 1000;
        let num_deletes = 1000;
        let mut kvs = Vec::new();
        for i in 0..num_entries {
            kvs.push(KV::new(key(i), value(i)));
        }
        for i in num_entries..num_entries + num_deletes {
            kvs.push(KV::tombstone(key(i)));
        }
        let mut iter = KvSliceIterator::new(kvs);
        let now = now_millis();
        let (table, smallest, largest, _, _) =
            build_sstable(DataFormat::V1, 0, 0, &mut iter).unwrap();

        assert_eq!(table.num_entries(), num_entries + num_deletes);
        assert_eq!(table.num_deletes(), num_deletes);
        assert_eq!(smallest, key(0));
        assert_eq!(largest, key(num_entries + num_deletes - 1));
        assert!(table.creation_time() >= now);
    }

    #[test]
    fn serialize_deserialize_round_trips_observable_fields() {
        let mut kvs = Vec::new();
        for i in 0..1000 {
            kvs.push(KV::new(key(i), value(i)));
        }
        kvs.push(KV::tombstone(key(1000)));
        kvs.push(KV::tombstone(key(1001)));
        let mut iter = KvSliceIterator::new(kvs);
        let (table, _, _, _, _) = build_sstable(DataFormat::V1, 0, 0, &mut iter).unwrap();

        let bytes = table.serialize();
        let (table2, consumed) = SSTable::deserialize(&bytes, 0).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(table.format(), table2.format());
        assert_eq!(table.index_offset(), table2.index_offset());
        assert_eq!(table.num_entries(), table2.num_entries());
        assert_eq!(table.num_deletes(), table2.num_deletes());
        assert_eq!(table.max_key_length(), table2.max_key_length());
        assert_eq!(table.data(), table2.data());
        assert_eq!(table.creation_time(), table2.creation_time());
    }
}
