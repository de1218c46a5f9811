use log::{debug, info, warn};

use super::access_engine::{require_id, AccessEngine};
use crate::access::types::{node_key, EntityRef};
use crate::error::{AccessError, AccessResult};

impl AccessEngine {
    /// Removes every grant on a node once the node itself is deleted.
    pub async fn remove_node(&self, node_uuid: &str) -> AccessResult<usize> {
        require_id("node", node_uuid)?;
        let removed = self
            .grants
            .delete_all_for_node(&node_key(node_uuid))
            .await
            .map_err(AccessError::store("remove node grants"))?;
        info!("Removed {} grant(s) for deleted node {}", removed, node_uuid);
        Ok(removed)
    }

    /// Revokes every non-owner grant held by a deleted principal.
    ///
    /// Owner grants are skipped so no node loses its owner; ownership has
    /// to be transferred by whoever deletes the user.
    pub async fn purge_entity(&self, entity: &EntityRef) -> AccessResult<usize> {
        require_id(entity.kind().as_str(), entity.raw_id())?;
        let entity_id = entity.entity_id();
        let grants = self
            .grants
            .by_entity(&entity_id)
            .await
            .map_err(AccessError::store("list entity grants"))?;

        let mut revoked = 0;
        for grant in grants {
            if grant.is_owner() {
                warn!("Not purging owner grant of {} on node {}", entity_id, grant.node_uuid());
                continue;
            }
            self.grants
                .delete(&grant.entity_id, &grant.node_id)
                .await
                .map_err(AccessError::store("revoke entity grant"))?;
            revoked += 1;
        }
        info!("Purged {} grant(s) held by {}", revoked, entity_id);
        Ok(revoked)
    }

    /// Polls the node's grant list until `entity`'s grant is present
    /// (`visible = true`) or absent (`visible = false`).
    ///
    /// Node-wide listings may lag behind writes. Callers that must observe
    /// their own write through [`AccessEngine::describe_access`] or
    /// [`AccessEngine::reachable_nodes`] can wait here first. Returns false
    /// if the retry policy is exhausted.
    pub async fn wait_for_grant(
        &self,
        entity: &EntityRef,
        node_uuid: &str,
        visible: bool,
    ) -> AccessResult<bool> {
        let node_id = node_key(node_uuid);
        let entity_id = entity.entity_id();
        let policy = &self.config.retry;

        for attempt in 0..policy.max_attempts {
            let grants = self
                .grants
                .by_node(&node_id)
                .await
                .map_err(AccessError::store("poll node grants"))?;
            if grants.iter().any(|grant| grant.entity_id == entity_id) == visible {
                return Ok(true);
            }
            if attempt + 1 < policy.max_attempts {
                let delay = policy.backoff(attempt);
                debug!(
                    "Grant {} on {} not yet {}, retrying in {:?}",
                    entity_id,
                    node_uuid,
                    if visible { "visible" } else { "gone" },
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::types::{AccessKind, Grant};
    use crate::config::{AccessConfig, RetryPolicy};
    use crate::stores::{GrantStore, MemoryGrantStore};
    use std::sync::Arc;

    fn fast_retry() -> AccessConfig {
        AccessConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff_ms: 1,
                max_backoff_ms: 2,
            },
            ..AccessConfig::default()
        }
    }

    #[tokio::test]
    async fn test_purge_keeps_owner_grants() {
        let store = Arc::new(MemoryGrantStore::new());
        store
            .put(Grant::new(&EntityRef::user("2"), "n1", AccessKind::Owner, "o1", "2"))
            .await
            .unwrap();
        store
            .put(Grant::new(&EntityRef::user("2"), "n2", AccessKind::Shared, "o1", "1"))
            .await
            .unwrap();
        let engine = AccessEngine::new(store.clone());

        assert_eq!(engine.purge_entity(&EntityRef::user("2")).await.unwrap(), 1);
        let left = store.all().await;
        assert_eq!(left.len(), 1);
        assert!(left[0].is_owner());
    }

    #[tokio::test]
    async fn test_wait_for_grant() {
        let store = Arc::new(MemoryGrantStore::new());
        let engine = AccessEngine::new(store.clone()).with_config(fast_retry());
        let entity = EntityRef::team("4");

        assert!(!engine.wait_for_grant(&entity, "n1", true).await.unwrap());
        assert!(engine.wait_for_grant(&entity, "n1", false).await.unwrap());

        store
            .put(Grant::new(&entity, "n1", AccessKind::Shared, "o1", "1"))
            .await
            .unwrap();
        assert!(engine.wait_for_grant(&entity, "n1", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_node_rejects_empty_id() {
        let engine = AccessEngine::new(Arc::new(MemoryGrantStore::new()));
        assert!(matches!(
            engine.remove_node("").await,
            Err(AccessError::InvalidIdentifier { .. })
        ));
    }
}
