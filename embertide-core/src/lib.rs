//! Core types and error handling for Embertide
//!
//! This crate contains the fundamental types shared by the SSTable engine,
//! the sequence allocator, and the cluster metadata responder:
//!
//! - Common error types with [`Error`] and [`Result`]
//! - The [`KV`] record and tombstone convention
//! - [`DataFormat`], the on-disk SSTable format tag
//! - [`AgentMeta`], the cluster membership record
//!
//! # Example
//!
//! ```
//! use embertide_core::{KV, Key, Value};
//!
//! let key: Key = b"keyprefix/somekey-0000000000".to_vec();
//! let value: Value = b"valueprefix/somevalue-0000000000".to_vec();
//! let kv = KV::new(key, value);
//! assert!(!kv.is_tombstone());
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
