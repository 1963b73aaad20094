//! Cluster membership and control-plane collaborators.
//!
//! This crate owns the pieces of the system that sit between the storage
//! engine and a running agent: the cluster gossip wire format, the
//! deterministic partition-hash leader chooser, and the control-plane client
//! contract used to look up topic metadata.

pub mod client;
pub mod leader;
pub mod membership;

pub use client::{ControlClient, TopicInfo};
pub use leader::choose_leader;
pub use membership::{deserialize_membership, serialize_membership};
