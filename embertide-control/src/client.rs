//! Control-plane client contract: topic catalog lookups.

use embertide_core::Result;

/// Metadata about a topic known to the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInfo {
    /// Topic name.
    pub name: String,
    /// Stable topic id used in partition-hash derivation.
    pub topic_id: i32,
    /// Number of partitions this topic is divided into.
    pub partition_count: i32,
}

/// Control-plane collaborator consumed by the metadata responder.
pub trait ControlClient: Send + Sync {
    /// Looks up one topic by name. `Ok(None)` means the topic does not exist.
    fn get_topic_info(&self, name: &str) -> Result<Option<TopicInfo>>;

    /// Returns every topic known to the control plane.
    fn get_all_topic_infos(&self) -> Result<Vec<TopicInfo>>;
}

/// In-memory stand-ins for tests that need a [`ControlClient`] without a
/// real control plane.
pub mod test_support {
    use super::*;
    use parking_lot::Mutex;

    /// An in-memory [`ControlClient`] for tests: a fixed topic catalog.
    #[derive(Default)]
    pub struct InMemControlClient {
        topics: Mutex<Vec<TopicInfo>>,
    }

    impl InMemControlClient {
        pub fn new(topics: Vec<TopicInfo>) -> Self {
            Self {
                topics: Mutex::new(topics),
            }
        }
    }

    impl ControlClient for InMemControlClient {
        fn get_topic_info(&self, name: &str) -> Result<Option<TopicInfo>> {
            Ok(self.topics.lock().iter().find(|t| t.name == name).cloned())
        }

        fn get_all_topic_infos(&self) -> Result<Vec<TopicInfo>> {
            Ok(self.topics.lock().clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemControlClient;
    use super::*;

    #[test]
    fn missing_topic_is_none_not_an_error() {
        let client = InMemControlClient::new(vec![TopicInfo {
            name: "orders".to_string(),
            topic_id: 1,
            partition_count: 4,
        }]);
        assert!(client.get_topic_info("unknown").unwrap().is_none());
        assert!(client.get_topic_info("orders").unwrap().is_some());
        assert_eq!(client.get_all_topic_infos().unwrap().len(), 1);
    }
}
