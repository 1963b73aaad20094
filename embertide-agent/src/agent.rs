//! The `Agent` facade: wires cluster membership, the control-plane client,
//! and the partition-hash leader chooser into the Kafka `Metadata` request
//! handler and the leader self-check used to reject misrouted requests.

use crate::kafka::{Broker, ErrorCode, MetadataRequest, MetadataResponse, PartitionMetadata, TopicMetadata};
use embertide_control::{choose_leader, ControlClient};
use embertide_core::{AgentMeta, Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Rightmost-occurrence AZ suffix convention carried over from a prior
/// product; kept for compatibility with already-deployed clients.
const LEGACY_AZ_PREFIX: &str = "ws_az=";
const AZ_PREFIX: &str = "tek_az=";

/// Extracts the availability zone encoded in a Kafka `ClientId`.
///
/// Searches for the rightmost occurrence of `tek_az=`, falling back to the
/// rightmost `ws_az=`. Returns an empty string (and logs a warning) if
/// neither is present.
fn extract_az(client_id: &str) -> String {
    if let Some(pos) = client_id.rfind(AZ_PREFIX) {
        return client_id[pos + AZ_PREFIX.len()..].to_string();
    }
    if let Some(pos) = client_id.rfind(LEGACY_AZ_PREFIX) {
        return client_id[pos + LEGACY_AZ_PREFIX.len()..].to_string();
    }
    log::warn!("ClientId {client_id:?} carries no AZ suffix; routing cross-AZ");
    String::new()
}

fn split_host_port(address: &str) -> Result<(String, u16)> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| Error::InvalidArgument(format!("not a host:port address: {address:?}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("not a host:port address: {address:?}")))?;
    Ok((host.to_string(), port))
}

/// Ties a [`ControlClient`] and a cluster-membership snapshot to this
/// agent's own identity, answering `Metadata` requests and leader
/// self-checks the way a running cluster node does.
pub struct Agent<C> {
    member_id: i32,
    control_client: Arc<C>,
    cluster_metadata: Mutex<Arc<Vec<AgentMeta>>>,
}

impl<C: ControlClient> Agent<C> {
    /// Creates an agent identified by `member_id`, backed by `control_client`
    /// and the initial `cluster_metadata` snapshot.
    pub fn new(member_id: i32, control_client: Arc<C>, cluster_metadata: Vec<AgentMeta>) -> Self {
        Self {
            member_id,
            control_client,
            cluster_metadata: Mutex::new(Arc::new(cluster_metadata)),
        }
    }

    /// Atomically replaces the cluster-membership snapshot. Readers in
    /// flight continue to see their own point-in-time view.
    pub fn update_cluster_metadata(&self, cluster_metadata: Vec<AgentMeta>) {
        *self.cluster_metadata.lock() = Arc::new(cluster_metadata);
    }

    fn snapshot(&self) -> Arc<Vec<AgentMeta>> {
        self.cluster_metadata.lock().clone()
    }

    /// Answers a Kafka `Metadata` request.
    ///
    /// Always returns a response: on success every topic carries real
    /// partition leader assignments; on a top-level failure (empty cluster
    /// metadata, a malformed broker address, a control-plane error) the
    /// response instead carries an error-coded entry per requested topic (or
    /// a single synthetic `"unknown"` entry if none were named), and the
    /// failure is also returned so the caller can short-circuit.
    pub fn handle_metadata_request(
        &self,
        request: &MetadataRequest,
    ) -> (MetadataResponse, Result<()>) {
        let client_az = extract_az(&request.client_id);
        let outcome = self.select_brokers(&client_az).and_then(|(brokers, agents)| {
            self.build_topic_metadata(request, &agents)
                .map(|topics| MetadataResponse { brokers, topics })
        });
        match outcome {
            Ok(response) => (response, Ok(())),
            Err(err) => {
                let response = Self::overlay_error_response(request, &err);
                (response, Err(err))
            }
        }
    }

    fn select_brokers(&self, client_az: &str) -> Result<(Vec<Broker>, Vec<AgentMeta>)> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Err(Error::NoClusterMetadata);
        }

        let mut filtered: Vec<AgentMeta> = snapshot
            .iter()
            .filter(|a| a.location == client_az)
            .cloned()
            .collect();

        if filtered.is_empty() {
            let fallback_az = &snapshot[0].location;
            log::warn!(
                "no agents in client AZ {client_az:?}; falling back to {fallback_az:?}"
            );
            filtered = snapshot
                .iter()
                .filter(|a| &a.location == fallback_az)
                .cloned()
                .collect();
        }

        let mut brokers = Vec::with_capacity(filtered.len());
        for agent in &filtered {
            let (host, port) = split_host_port(&agent.kafka_address)?;
            brokers.push(Broker {
                node_id: agent.id,
                host,
                port,
            });
        }
        Ok((brokers, filtered))
    }

    fn build_topic_metadata(
        &self,
        request: &MetadataRequest,
        agents: &[AgentMeta],
    ) -> Result<Vec<TopicMetadata>> {
        let names: Vec<String> = match &request.topics {
            Some(names) => names.clone(),
            None => self
                .control_client
                .get_all_topic_infos()?
                .into_iter()
                .map(|t| t.name)
                .collect(),
        };

        let mut topics = Vec::with_capacity(names.len());
        for name in names {
            match self.control_client.get_topic_info(&name)? {
                None => topics.push(TopicMetadata {
                    name,
                    error_code: ErrorCode::UnknownTopicOrPartition,
                    partitions: Vec::new(),
                }),
                Some(info) => {
                    let mut partitions = Vec::with_capacity(info.partition_count as usize);
                    for partition_index in 0..info.partition_count {
                        let leader = choose_leader(agents, info.topic_id, partition_index)?;
                        partitions.push(PartitionMetadata {
                            partition_index,
                            leader_id: leader.id,
                        });
                    }
                    topics.push(TopicMetadata {
                        name,
                        error_code: ErrorCode::None,
                        partitions,
                    });
                }
            }
        }
        Ok(topics)
    }

    fn overlay_error_response(request: &MetadataRequest, _err: &Error) -> MetadataResponse {
        let topics = match &request.topics {
            Some(names) if !names.is_empty() => names
                .iter()
                .map(|name| TopicMetadata {
                    name: name.clone(),
                    error_code: ErrorCode::UnknownTopicOrPartition,
                    partitions: Vec::new(),
                })
                .collect(),
            _ => vec![TopicMetadata {
                name: "unknown".to_string(),
                error_code: ErrorCode::UnknownTopicOrPartition,
                partitions: Vec::new(),
            }],
        };
        MetadataResponse {
            brokers: Vec::new(),
            topics,
        }
    }

    /// Returns true if this agent is the leader for `(topic_id,
    /// partition_id)` among the agents in its own availability zone.
    pub fn is_leader(&self, topic_id: i32, partition_id: i32, own_location: &str) -> Result<bool> {
        let snapshot = self.snapshot();
        let same_az: Vec<AgentMeta> = snapshot
            .iter()
            .filter(|a| a.location == own_location)
            .cloned()
            .collect();
        let leader = choose_leader(&same_az, topic_id, partition_id)?;
        Ok(leader.id == self.member_id)
    }
}
