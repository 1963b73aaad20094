//! LSM tree registration interface.
//!
//! The sequence allocator (and, in the wider system, the flush/compaction
//! path) needs to know which SSTables currently cover a key range before it
//! can safely reuse or replace one, and needs a way to atomically swap a set
//! of old tables for a set of new ones once a write lands. Both concerns are
//! expressed here as a single collaborator trait; the real LSM tree lives
//! outside this crate.

use embertide_core::{Key, Result, SSTableId};

/// A table known to cover some part of a queried key range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTableInfo {
    /// The table's object-store identifier.
    pub id: SSTableId,
    /// Smallest key stored in this table.
    pub key_start: Key,
    /// Largest key stored in this table.
    pub key_end: Key,
}

/// Tables whose key ranges do not overlap each other, returned together
/// because they all touch the queried range.
pub type NonOverlappingTables = Vec<QueryTableInfo>;

/// Groups of [`NonOverlappingTables`], ordered newest-first: a key may need
/// to be looked up in each group in turn until found.
pub type OverlappingTables = Vec<NonOverlappingTables>;

/// One table being registered as a replacement for a range of existing
/// tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The new table's object-store identifier.
    pub table_id: SSTableId,
    /// Smallest key covered by the new table.
    pub key_start: Key,
    /// Largest key covered by the new table.
    pub key_end: Key,
}

/// A set of registrations to apply to the LSM tree as one atomic change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationBatch {
    /// The tables being registered.
    pub registrations: Vec<Registration>,
}

/// LSM tree collaborator contract consumed by the sequence allocator.
pub trait LsmReceiver: Send + Sync {
    /// Returns every known table (grouped by overlap) that could contain a
    /// key in `[key_start, key_end)`.
    fn query_tables_in_range(
        &self,
        key_start: &[u8],
        key_end: &[u8],
    ) -> Result<OverlappingTables>;

    /// Applies `batch` to the LSM tree. `completion` is invoked once the
    /// registration has been durably recorded (or has failed), receiving the
    /// outcome; its own return value is propagated back to the caller of
    /// `apply_lsm_changes`.
    fn apply_lsm_changes(
        &self,
        batch: RegistrationBatch,
        completion: &mut dyn FnMut(Result<()>) -> Result<()>,
    ) -> Result<()>;
}

/// In-memory stand-ins for tests that need an [`LsmReceiver`] without a real
/// LSM tree.
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// An in-memory [`LsmReceiver`] for tests: applies registrations
    /// synchronously and keeps every registered table visible to range
    /// queries (it never prunes or compacts).
    #[derive(Default)]
    pub struct InMemLsmReceiver {
        tables: Mutex<Vec<QueryTableInfo>>,
    }

    impl InMemLsmReceiver {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl LsmReceiver for InMemLsmReceiver {
        fn query_tables_in_range(
            &self,
            key_start: &[u8],
            key_end: &[u8],
        ) -> Result<OverlappingTables> {
            let matches: NonOverlappingTables = self
                .tables
                .lock()
                .iter()
                .filter(|t| t.key_start.as_slice() < key_end && key_start < t.key_end.as_slice())
                .cloned()
                .collect();
            if matches.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(vec![matches])
            }
        }

        fn apply_lsm_changes(
            &self,
            batch: RegistrationBatch,
            completion: &mut dyn FnMut(Result<()>) -> Result<()>,
        ) -> Result<()> {
            let mut tables = self.tables.lock();
            for reg in batch.registrations {
                tables.push(QueryTableInfo {
                    id: reg.table_id,
                    key_start: reg.key_start,
                    key_end: reg.key_end,
                });
            }
            drop(tables);
            completion(Ok(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemLsmReceiver;
    use super::*;

    #[test]
    fn registered_table_is_visible_to_overlapping_range_query() {
        let lsm = InMemLsmReceiver::new();
        let batch = RegistrationBatch {
            registrations: vec![Registration {
                table_id: "table-1".to_string(),
                key_start: b"a".to_vec(),
                key_end: b"m".to_vec(),
            }],
        };
        lsm.apply_lsm_changes(batch, &mut |r| r).unwrap();

        let found = lsm.query_tables_in_range(b"c", b"d").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].len(), 1);
        assert_eq!(found[0][0].id, "table-1");

        let empty = lsm.query_tables_in_range(b"n", b"z").unwrap();
        assert!(empty.is_empty());
    }
}
