//! The cluster agent facade: Kafka `Metadata` request handling and the
//! leader self-check, built on top of `embertide-control`'s membership and
//! leader-selection primitives.
//!
//! Bootstrapping (CLI parsing, logger configuration, signal handling) and
//! the Kafka wire codec are assumed to be supplied by the binary that
//! embeds this crate; neither is implemented here.

pub mod agent;
pub mod kafka;

pub use agent::Agent;
