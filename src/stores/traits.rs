use async_trait::async_trait;
use std::fmt::Debug;

use super::error::StoreResult;
use super::types::{NodeRecord, Team};
use crate::access::types::Grant;

/// Key-value persistence for grants.
///
/// Point reads and writes are expected to be strongly consistent. The
/// enumerations (`by_node`, `by_entity`, `by_workspace`) may be served from
/// secondary indexes and lag behind recent writes.
#[async_trait]
pub trait GrantStore: Send + Sync + Debug {
    /// Inserts or replaces the grant keyed by its entity and node ids
    async fn put(&self, grant: Grant) -> StoreResult<()>;

    /// Removes a grant; removing a missing grant is not an error
    async fn delete(&self, entity_id: &str, node_id: &str) -> StoreResult<()>;

    async fn exists(&self, entity_id: &str, node_id: &str) -> StoreResult<bool>;

    async fn by_node(&self, node_id: &str) -> StoreResult<Vec<Grant>>;

    async fn by_entity(&self, entity_id: &str) -> StoreResult<Vec<Grant>>;

    /// Workspace-kind grants issued to the given organization
    async fn by_workspace(&self, organization_id: &str) -> StoreResult<Vec<Grant>>;

    /// True if any of `entity_ids` holds a grant on the node
    async fn batch_check(&self, entity_ids: &[String], node_id: &str) -> StoreResult<bool> {
        for entity_id in entity_ids {
            if self.exists(entity_id, node_id).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Writes every grant in one round-trip. Callers keep batches within
    /// [`GrantStore::max_batch_size`].
    async fn batch_put(&self, grants: Vec<Grant>) -> StoreResult<()> {
        for grant in grants {
            self.put(grant).await?;
        }
        Ok(())
    }

    /// Removes every grant on the node and reports how many were removed
    async fn delete_all_for_node(&self, node_id: &str) -> StoreResult<usize>;

    /// Batch size limit of the native batched write path, or `None` when the
    /// store has none and grants must be written one by one.
    fn max_batch_size(&self) -> Option<usize> {
        None
    }
}

/// Read-only view of users and teams.
#[async_trait]
pub trait IdentityStore: Send + Sync + Debug {
    async fn user_exists(&self, user_id: i64) -> StoreResult<bool>;

    async fn team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>>;

    /// Teams the user belongs to within one organization
    async fn teams_for_user(&self, user_id: i64, organization_id: &str) -> StoreResult<Vec<Team>>;
}

/// Authoritative node ownership, consulted only to repair a missing owner grant.
#[async_trait]
pub trait NodeDirectory: Send + Sync + Debug {
    async fn node_by_id(&self, node_uuid: &str) -> StoreResult<Option<NodeRecord>>;
}
