//! Cluster gossip wire format for agent membership records.
//!
//! Each agent advertises itself on the gossip bus as three length-prefixed
//! UTF-8 strings, in order: `cluster_listen_address`, `kafka_listener_address`,
//! `location`. This module only handles that framing; the caller pairs the
//! decoded addresses with a stable member id to build an `AgentMeta`.

use embertide_core::Result;
use embertide_storage::encoding::{read_length_prefixed, write_length_prefixed};

/// Serializes a membership record to its gossip-bus wire form.
pub fn serialize_membership(
    cluster_listen_address: &str,
    kafka_listener_address: &str,
    location: &str,
) -> Vec<u8> {
    let mut buf = Vec::new();
    write_length_prefixed(&mut buf, cluster_listen_address.as_bytes());
    write_length_prefixed(&mut buf, kafka_listener_address.as_bytes());
    write_length_prefixed(&mut buf, location.as_bytes());
    buf
}

/// Deserializes a membership record starting at `offset`, returning the
/// decoded `(cluster_listen_address, kafka_listener_address, location)` and
/// the offset just past the consumed bytes.
pub fn deserialize_membership(buf: &[u8], offset: usize) -> Result<(String, String, String, usize)> {
    let (cluster_addr, next) = read_length_prefixed(buf, offset)?;
    let (kafka_addr, next) = read_length_prefixed(buf, next)?;
    let (location, next) = read_length_prefixed(buf, next)?;
    Ok((
        String::from_utf8_lossy(&cluster_addr).into_owned(),
        String::from_utf8_lossy(&kafka_addr).into_owned(),
        String::from_utf8_lossy(&location).into_owned(),
        next,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_three_fields() {
        let buf = serialize_membership("10.0.0.1:7000", "10.0.0.1:9092", "az-1");
        let (cluster_addr, kafka_addr, location, next) = deserialize_membership(&buf, 0).unwrap();
        assert_eq!(cluster_addr, "10.0.0.1:7000");
        assert_eq!(kafka_addr, "10.0.0.1:9092");
        assert_eq!(location, "az-1");
        assert_eq!(next, buf.len());
    }

    #[test]
    fn rejects_truncated_buffer() {
        let mut buf = serialize_membership("a", "b", "c");
        buf.truncate(buf.len() - 1);
        assert!(deserialize_membership(&buf, 0).is_err());
    }
}
