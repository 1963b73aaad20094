//! Deterministic partition-hash leader selection.

use embertide_core::{AgentMeta, Error, Result};
use embertide_storage::encoding::{fold, partition_hash};

/// Chooses the leader for `(topic_id, partition_id)` from `agents`.
///
/// `agents` is a caller-filtered candidate set (e.g. already restricted to
/// one AZ); every caller presented with the same `(agents, topic_id,
/// partition_id)` selects the same leader, since the selection is a pure
/// fold over the partition hash.
pub fn choose_leader(agents: &[AgentMeta], topic_id: i32, partition_id: i32) -> Result<&AgentMeta> {
    if agents.is_empty() {
        return Err(Error::InvalidArgument(
            "cannot choose a leader from an empty agent set".to_string(),
        ));
    }
    let hash = partition_hash(topic_id, partition_id);
    let index = fold(&hash, agents.len())?;
    Ok(&agents[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: i32, location: &str) -> AgentMeta {
        AgentMeta {
            id,
            location: location.to_string(),
            kafka_address: format!("10.0.0.{id}:9092"),
            cluster_address: format!("10.0.0.{id}:7000"),
        }
    }

    #[test]
    fn same_inputs_choose_the_same_leader() {
        let agents = vec![agent(1, "a"), agent(2, "a"), agent(3, "a")];
        let first = choose_leader(&agents, 42, 3).unwrap().id;
        let second = choose_leader(&agents, 42, 3).unwrap().id;
        assert_eq!(first, second);
    }

    #[test]
    fn empty_agent_set_is_an_error() {
        assert!(choose_leader(&[], 1, 0).is_err());
    }
}
