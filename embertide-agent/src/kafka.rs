//! Minimal Kafka `Metadata` request/response types.
//!
//! Only the fields consulted by [`crate::Agent::handle_metadata_request`] are
//! modeled here; wire encode/decode is a collaborator assumed to exist
//! outside this crate.

/// A `Metadata` request.
#[derive(Debug, Clone)]
pub struct MetadataRequest {
    /// The client's advertised id, used to extract its availability zone.
    pub client_id: String,
    /// `None` means "all topics"; `Some(list)` restricts to those names
    /// (an empty list means "no topics").
    pub topics: Option<Vec<String>>,
}

/// A broker entry in a `Metadata` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broker {
    pub node_id: i32,
    pub host: String,
    pub port: u16,
}

/// Error codes surfaced on a per-topic basis, matching the Kafka protocol's
/// numeric `ErrorCode` field for the subset this crate produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    None = 0,
    UnknownTopicOrPartition = 3,
}

/// Leader assignment for one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub partition_index: i32,
    pub leader_id: i32,
}

/// One topic entry in a `Metadata` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub error_code: ErrorCode,
    pub partitions: Vec<PartitionMetadata>,
}

/// A `Metadata` response.
#[derive(Debug, Clone)]
pub struct MetadataResponse {
    pub brokers: Vec<Broker>,
    pub topics: Vec<TopicMetadata>,
}
