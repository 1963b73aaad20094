//! Encoding primitives shared by the SSTable format and the sequence key format.
//!
//! Every multi-byte integer in this crate's on-disk and wire formats is
//! big-endian; this module is the single place that decision is made so the
//! SSTable, sequence, and membership formats stay consistent with each other.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use embertide_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::io::Cursor;

/// Width in bytes of a partition hash.
pub const PART_HASH_LEN: usize = 16;

/// Width in bytes of a version tag.
pub const VERSION_TAG_LEN: usize = 8;

/// Computes the 16-byte partition hash of `data`.
///
/// The same function derives both the per-(topic, partition) hash used for
/// leader selection and the sequence key namespace hash — both just hash an
/// opaque byte string, they differ only in what string is fed in.
pub fn create_hash(data: &[u8]) -> [u8; PART_HASH_LEN] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; PART_HASH_LEN];
    out.copy_from_slice(&digest[..PART_HASH_LEN]);
    out
}

/// Computes the partition hash for a `(topic_id, partition_id)` pair.
///
/// Matches the sequence-key hash path: both feed a deterministic byte string
/// through [`create_hash`].
pub fn partition_hash(topic_id: i32, partition_id: i32) -> [u8; PART_HASH_LEN] {
    let mut buf = Vec::with_capacity(8);
    buf.write_i32::<BigEndian>(topic_id).unwrap();
    buf.write_i32::<BigEndian>(partition_id).unwrap();
    create_hash(&buf)
}

/// Reduces a partition hash to a `usize` index into a slice of length `len`.
///
/// Folds the first 8 bytes of `hash`, interpreted as a big-endian `u64`, modulo
/// `len`. `len == 0` is a caller error (the set of candidates must be
/// filtered to non-empty upstream).
pub fn fold(hash: &[u8; PART_HASH_LEN], len: usize) -> Result<usize> {
    if len == 0 {
        return Err(Error::InvalidArgument(
            "cannot fold a partition hash over an empty candidate set".to_string(),
        ));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&hash[..8]);
    let value = u64::from_be_bytes(buf);
    Ok((value % len as u64) as usize)
}

/// Appends an 8-byte big-endian version tag to `buf`, returning `buf`.
pub fn encode_version(mut buf: Vec<u8>, version: u64) -> Vec<u8> {
    buf.write_u64::<BigEndian>(version).unwrap();
    buf
}

/// Builds the 24-byte sequence key for `name`: `create_hash("sequence." + name) || encode_version(0)`.
pub fn sequence_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(PART_HASH_LEN + VERSION_TAG_LEN);
    key.extend_from_slice(&create_hash(format!("sequence.{name}").as_bytes()));
    encode_version(key, 0)
}

/// Writes `bytes` preceded by a big-endian `u32` length prefix.
pub fn write_length_prefixed(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.write_u32::<BigEndian>(bytes.len() as u32).unwrap();
    buf.extend_from_slice(bytes);
}

/// Reads a length-prefixed byte string starting at `offset`, returning the
/// bytes and the offset just past them.
pub fn read_length_prefixed(buf: &[u8], offset: usize) -> Result<(Vec<u8>, usize)> {
    if offset + 4 > buf.len() {
        return Err(Error::Corruption("truncated length prefix".to_string()));
    }
    let len = Cursor::new(&buf[offset..offset + 4]).read_u32::<BigEndian>()? as usize;
    let start = offset + 4;
    let end = start
        .checked_add(len)
        .ok_or_else(|| Error::Corruption("length prefix overflow".to_string()))?;
    if end > buf.len() {
        return Err(Error::Corruption(
            "length prefix exceeds buffer".to_string(),
        ));
    }
    Ok((buf[start..end].to_vec(), end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_hash_is_deterministic() {
        let h1 = partition_hash(7, 3);
        let h2 = partition_hash(7, 3);
        assert_eq!(h1, h2);
    }

    #[test]
    fn partition_hash_distinguishes_partitions() {
        let h1 = partition_hash(7, 3);
        let h2 = partition_hash(7, 4);
        assert_ne!(h1, h2);
    }

    #[test]
    fn fold_is_in_range_and_rejects_empty_set() {
        let h = partition_hash(7, 3);
        let idx = fold(&h, 5).unwrap();
        assert!(idx < 5);
        assert!(fold(&h, 0).is_err());
    }

    #[test]
    fn sequence_key_is_24_bytes() {
        let key = sequence_key("test-sequence");
        assert_eq!(key.len(), PART_HASH_LEN + VERSION_TAG_LEN);
        assert_eq!(&key[16..24], &0u64.to_be_bytes());
    }

    #[test]
    fn length_prefixed_round_trips() {
        let mut buf = Vec::new();
        write_length_prefixed(&mut buf, b"cluster-listen-address:9092");
        let (bytes, next) = read_length_prefixed(&buf, 0).unwrap();
        assert_eq!(bytes, b"cluster-listen-address:9092");
        assert_eq!(next, buf.len());
    }

    #[test]
    fn length_prefixed_rejects_truncated_buffer() {
        let mut buf = Vec::new();
        write_length_prefixed(&mut buf, b"hello");
        buf.truncate(buf.len() - 1);
        assert!(read_length_prefixed(&buf, 0).is_err());
    }
}
