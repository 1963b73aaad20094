//! SSTable construction from a sorted key-value stream.

use super::{now_millis, write_index_entry, IndexEntry, SSTable, SSTableInner};
use byteorder::{BigEndian, WriteBytesExt};
use embertide_core::{DataFormat, Key, Result, KV};
use std::sync::Arc;

/// A finite, key-ordered source of [`KV`] records fed to [`build_sstable`].
///
/// Implementations are the caller's obligation to pre-sort and de-duplicate;
/// the builder does not check ordering and produces an unspecified (but safe)
/// table if the contract is violated.
pub trait KvIterator {
    /// Returns the next record, or `Ok(None)` once the source is exhausted.
    fn next(&mut self) -> Result<Option<KV>>;
}

/// A [`KvIterator`] over an in-memory `Vec<KV>`, for tests and for the
/// sequence allocator's single-entry reservation tables.
pub struct KvSliceIterator {
    items: std::vec::IntoIter<KV>,
}

impl KvSliceIterator {
    /// Wraps `items` as a [`KvIterator`].
    pub fn new(items: Vec<KV>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl KvIterator for KvSliceIterator {
    fn next(&mut self) -> Result<Option<KV>> {
        Ok(self.items.next())
    }
}

/// Builds an immutable [`SSTable`] from a sorted, key-ordered `iter`.
///
/// `range_start`/`range_end` are opaque caller bookkeeping values (e.g. an
/// LSM level's key-range hint); they are not interpreted here and are
/// returned unchanged for the caller to thread into its own registration
/// record.
///
/// Returns the built table along with the smallest and largest keys observed
/// and the echoed range markers. Fails only if `iter` fails; an empty input
/// always succeeds, producing a zero-entry table with empty smallest/largest
/// keys.
pub fn build_sstable(
    format: DataFormat,
    range_start: i64,
    range_end: i64,
    iter: &mut dyn KvIterator,
) -> Result<(SSTable, Key, Key, i64, i64)> {
    let mut data = Vec::new();
    let mut index = Vec::new();
    let mut num_entries: u32 = 0;
    let mut num_deletes: u32 = 0;
    let mut max_key_length: u32 = 0;
    let mut smallest_key: Key = Vec::new();
    let mut largest_key: Key = Vec::new();

    while let Some(kv) = iter.next()? {
        let entry_offset = data.len() as u32;

        data.write_u32::<BigEndian>(kv.key.len() as u32).unwrap();
        data.extend_from_slice(&kv.key);

        match &kv.value {
            Some(value) => {
                data.write_u32::<BigEndian>(value.len() as u32).unwrap();
                data.extend_from_slice(value);
            }
            None => {
                data.write_u32::<BigEndian>(super::TOMBSTONE_SENTINEL)
                    .unwrap();
                num_deletes += 1;
            }
        }

        max_key_length = max_key_length.max(kv.key.len() as u32);
        if num_entries == 0 {
            smallest_key = kv.key.clone();
        }
        largest_key = kv.key.clone();

        index.push(IndexEntry {
            key: kv.key,
            offset: entry_offset,
        });
        num_entries += 1;
    }

    let index_offset = data.len() as u32;
    for entry in &index {
        write_index_entry(&mut data, entry);
    }

    let table = SSTable {
        inner: Arc::new(SSTableInner {
            format,
            data,
            index_offset,
            num_entries,
            num_deletes,
            max_key_length,
            creation_time: now_millis(),
            index,
        }),
    };

    Ok((table, smallest_key, largest_key, range_start, range_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_builds_empty_table() {
        let mut iter = KvSliceIterator::new(Vec::new());
        let (table, smallest, largest, _, _) =
            build_sstable(DataFormat::V1, 0, 0, &mut iter).unwrap();
        assert_eq!(table.num_entries(), 0);
        assert!(smallest.is_empty());
        assert!(largest.is_empty());
    }
}
