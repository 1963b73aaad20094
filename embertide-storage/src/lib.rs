//! Storage primitives for Embertide
//!
//! This crate implements the two durable building blocks the rest of the
//! cluster is built on:
//!
//! - **SSTable**: an immutable, sorted, index-searchable key-value file.
//! - **Sequence allocator**: a durable, cluster-safe monotonic counter built
//!   on top of SSTables, with block reservation to amortise durable writes.
//!
//! Both depend only on two small external-collaborator traits —
//! [`object_store::ObjectStore`] and [`lsm::LsmReceiver`] — so this crate has
//! no knowledge of what backs blob storage or the wider LSM tree; production
//! code supplies real implementations, tests use the in-memory stand-ins
//! included here.
//!
//! # Architecture
//!
//! ```text
//! generate_sequence(name)
//!   → in-memory block exhausted?
//!       → LSM.query_tables_in_range(sequenceKey(name)) → ObjectStore.get (load)
//!       → build_sstable([sequenceKey(name) -> reservedTo]) → ObjectStore.put
//!       → LSM.apply_lsm_changes (register)
//!   → hand out next value from the in-memory block
//! ```

pub mod config;
pub mod encoding;
pub mod lsm;
pub mod object_store;
pub mod sequences;
pub mod sstable;

pub use config::SequenceConfig;
pub use lsm::LsmReceiver;
pub use object_store::ObjectStore;
pub use sequences::Sequences;
pub use sstable::SSTable;
