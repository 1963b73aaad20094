//! Object store client interface.
//!
//! The real network-backed client lives outside this crate (it is one of the
//! external collaborators listed in the system overview); [`InMemObjectStore`]
//! is a throwaway stand-in used by this crate's own tests and by anything
//! downstream that wants to exercise the sequence allocator without a real
//! bucket.

use embertide_core::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Blob storage client contract consumed by the sequence allocator.
pub trait ObjectStore: Send + Sync {
    /// Fetches the bytes stored at `key` within `bucket`.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Stores `data` at `key` within `bucket`, overwriting any prior value.
    fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()>;
}

/// An in-memory [`ObjectStore`] for tests.
#[derive(Default)]
pub struct InMemObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl InMemObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for InMemObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| Error::ObjectStore(format!("no such object: {bucket}/{key}")))
    }

    fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }
}
