//! SSTable iteration and seek support.

use super::{decode_entry_at, SSTable};
use embertide_core::{Key, Result, KV};

/// An iterator over a range of an [`SSTable`]'s entries, in ascending key
/// order.
///
/// Obtained from [`SSTable::new_iterator`]. Holds a clone of the table's
/// shared handle, so it stays valid independent of the table's other owners
/// and of any other iterator over the same table.
pub struct SSTableIterator {
    table: SSTable,
    pos: usize,
    end_key: Option<Key>,
    current: Option<KV>,
    exhausted: bool,
}

impl SSTableIterator {
    pub(crate) fn new(table: SSTable, pos: usize, end_key: Option<Key>) -> Self {
        Self {
            table,
            pos,
            end_key,
            current: None,
            exhausted: false,
        }
    }

    pub(crate) fn load_current(&mut self) {
        if self.exhausted {
            self.current = None;
            return;
        }
        let index = &self.table.inner.index;
        if self.pos >= index.len() {
            self.current = None;
            self.exhausted = true;
            return;
        }
        let entry = &index[self.pos];
        if let Some(end) = &self.end_key {
            if entry.key.as_slice() >= end.as_slice() {
                self.current = None;
                self.exhausted = true;
                return;
            }
        }
        // Errors here indicate a corrupt table, not an iteration-protocol
        // failure; surfacing them via `Current` would force every caller to
        // handle a case that only the original `Deserialize`/`new_iterator`
        // call should ever see, so we decode eagerly and trust the table.
        self.current = decode_entry_at(&self.table.inner.data, entry.offset as usize).ok();
    }

    /// Returns true if [`Self::current`] has a record to yield.
    pub fn is_valid(&self) -> bool {
        self.current.is_some()
    }

    /// Returns the current record. Panics if the iterator is not valid;
    /// callers must check [`Self::is_valid`] first.
    pub fn current(&self) -> &KV {
        self.current
            .as_ref()
            .expect("current() called on an invalid iterator")
    }

    /// Advances to the next record in range.
    ///
    /// A no-op once the iterator has become invalid: further calls are
    /// idempotent and never error.
    pub fn next(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        self.pos += 1;
        self.load_current();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::{build_sstable, KvSliceIterator};
    use embertide_core::{DataFormat, Key, Value, KV};

    fn key(i: usize) -> Key {
        format!("keyprefix/somekey-{i:010}").into_bytes()
    }
    fn value(i: usize) -> Value {
        format!("valueprefix/somevalue-{i:010}").into_bytes()
    }

    fn table_with_gaps() -> super::SSTable {
        let kvs = vec![
            KV::new(key(1500), value(1500)),
            KV::new(b"keyprefix/somekey-00000015501234".to_vec(), b"valueprefix/somevalue-00000015501234".to_vec()),
            KV::new(key(1600), value(1600)),
        ];
        let mut iter = KvSliceIterator::new(kvs);
        build_sstable(DataFormat::V1, 0, 0, &mut iter).unwrap().0
    }

    #[test]
    fn seek_with_gap_advances_to_next_greater_key() {
        let table = table_with_gaps();
        let mut iter = table
            .new_iterator(Some(b"keyprefix/somekey-0000001501"), None)
            .unwrap();
        assert!(iter.is_valid());
        assert_eq!(
            iter.current().key,
            b"keyprefix/somekey-00000015501234".to_vec()
        );

        iter.next().unwrap();
        assert!(iter.is_valid());
        assert_eq!(iter.current().key, key(1600));

        iter.next().unwrap();
        assert!(!iter.is_valid());

        // Idempotent once exhausted.
        iter.next().unwrap();
        assert!(!iter.is_valid());
    }

    #[test]
    fn seek_past_every_key_is_invalid() {
        let table = table_with_gaps();
        let iter = table
            .new_iterator(Some(b"zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz"), None)
            .unwrap();
        assert!(!iter.is_valid());
    }

    #[test]
    fn tombstones_are_yielded_alongside_live_records() {
        let kvs = vec![
            KV::tombstone(b"keyPrefix/key0".to_vec()),
            KV::new(b"keyPrefix/key1".to_vec(), b"val1".to_vec()),
            KV::new(b"keyPrefix/key2".to_vec(), b"val2".to_vec()),
            KV::tombstone(b"keyPrefix/key3".to_vec()),
        ];
        let mut builder_iter = KvSliceIterator::new(kvs);
        let (table, _, _, _, _) = build_sstable(DataFormat::V1, 0, 0, &mut builder_iter).unwrap();

        let mut iter = table.new_iterator(Some(b"keyPrefix/"), None).unwrap();

        assert!(iter.is_valid());
        assert_eq!(iter.current().key, b"keyPrefix/key0");
        assert!(iter.current().value.is_none());
        iter.next().unwrap();

        assert!(iter.is_valid());
        assert_eq!(iter.current().key, b"keyPrefix/key1");
        assert_eq!(iter.current().value.as_deref(), Some(&b"val1"[..]));
        iter.next().unwrap();

        assert!(iter.is_valid());
        assert_eq!(iter.current().key, b"keyPrefix/key2");
        assert_eq!(iter.current().value.as_deref(), Some(&b"val2"[..]));
        iter.next().unwrap();

        assert!(iter.is_valid());
        assert_eq!(iter.current().key, b"keyPrefix/key3");
        assert!(iter.current().value.is_none());
        iter.next().unwrap();

        assert!(!iter.is_valid());
    }

    #[test]
    fn range_iteration_respects_half_open_bounds() {
        let num_entries = 1000;
        let mut kvs = Vec::new();
        for i in 0..num_entries {
            kvs.push(KV::new(key(i), value(i)));
        }
        let mut builder_iter = KvSliceIterator::new(kvs);
        let (table, _, _, _, _) = build_sstable(DataFormat::V1, 0, 0, &mut builder_iter).unwrap();

        let mut iter = table
            .new_iterator(
                Some(b"keyprefix/somekey-0000000300"),
                Some(b"keyprefix/somekey-0000000900"),
            )
            .unwrap();
        let mut i = 300;
        while iter.is_valid() {
            assert_eq!(iter.current().key, key(i));
            i += 1;
            iter.next().unwrap();
        }
        assert_eq!(i, 900);

        // Prefix key greater than a stored key advances past it.
        let iter2 = table
            .new_iterator(Some(b"keyprefix/somekey-0000000300999"), None)
            .unwrap();
        assert!(iter2.is_valid());
        assert_eq!(iter2.current().key, key(301));

        // Equal start/end is an empty range.
        let iter3 = table
            .new_iterator(
                Some(b"keyprefix/somekey-0000000700"),
                Some(b"keyprefix/somekey-0000000700"),
            )
            .unwrap();
        assert!(!iter3.is_valid());
    }
}
