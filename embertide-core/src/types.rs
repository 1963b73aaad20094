//! Core types used throughout Embertide
//!
//! This module contains the fundamental data types that form the basis
//! of the SSTable data model, the sequence key format, and cluster metadata.

/// A key, represented as a byte vector. Ordered by unsigned lexicographic comparison.
pub type Key = Vec<u8>;

/// A value, represented as a byte vector.
pub type Value = Vec<u8>;

/// An opaque, globally unique identifier assigned to an SSTable when it is
/// about to be written to object storage. UUIDv4-derived; used verbatim as
/// the object-store key.
pub type SSTableId = String;

/// A key-value record as stored in (and iterated from) an SSTable.
///
/// `value == None` represents a tombstone: the absence of a value, distinguished
/// from an empty value (`Some(Vec::new())`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KV {
    /// The key
    pub key: Key,
    /// The value, or `None` for a tombstone
    pub value: Option<Value>,
}

impl KV {
    /// Creates a live (non-tombstone) KV record
    pub fn new(key: Key, value: Value) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    /// Creates a tombstone record for `key`
    pub fn tombstone(key: Key) -> Self {
        Self { key, value: None }
    }

    /// Returns true if this record is a tombstone
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// The on-disk SSTable format version.
///
/// New variants are additive; `deserialize` dispatches on this tag so future
/// format changes do not need to break readers of older tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// The initial, and currently only, on-disk format.
    V1,
}

impl DataFormat {
    /// The single-byte wire tag for this format.
    pub fn as_u8(self) -> u8 {
        match self {
            DataFormat::V1 => 0,
        }
    }

    /// Parses a format tag previously produced by [`DataFormat::as_u8`].
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(DataFormat::V1),
            _ => None,
        }
    }
}

/// Metadata about a cluster agent, as published on the membership gossip bus.
///
/// Agents are identified by a stable integer id; `location` is the agent's
/// availability zone, used by the metadata responder (see
/// `embertide_control::leader`) to prefer same-AZ brokers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMeta {
    /// Stable cluster member id (Kafka `NodeId`)
    pub id: i32,
    /// Availability zone this agent belongs to
    pub location: String,
    /// The address this agent's Kafka listener accepts connections on, `"host:port"`
    pub kafka_address: String,
    /// The address this agent's cluster gossip listener accepts connections on
    pub cluster_address: String,
}
