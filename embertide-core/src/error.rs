//! Error types for Embertide
//!
//! This module defines the error types used throughout the SSTable engine,
//! the sequence allocator, and the cluster metadata responder.

use thiserror::Error;

/// The main error type for Embertide operations
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialization/deserialization error occurred
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption was detected (bad SSTable bytes, checksum mismatch, ...)
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// An invalid argument was supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The object store rejected or failed a get/put
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// The LSM receiver rejected a query or registration
    #[error("LSM error: {0}")]
    Lsm(String),

    /// No cluster metadata is available to answer a metadata request
    #[error("no cluster metadata available")]
    NoClusterMetadata,

    /// The requested topic does not exist
    #[error("unknown topic or partition")]
    UnknownTopicOrPartition,

    /// A storage engine invariant was violated
    #[error("Storage engine error: {0}")]
    StorageEngine(String),
}

/// A specialized Result type for Embertide operations
pub type Result<T> = std::result::Result<T, Error>;
