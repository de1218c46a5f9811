//! In-process collaborator implementations.
//!
//! These back embedded deployments and tests. The grant store gives
//! read-your-writes on every call, so it never exhibits the index lag a
//! remote store may have.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use super::error::StoreResult;
use super::traits::{GrantStore, IdentityStore, NodeDirectory};
use super::types::{NodeRecord, Team};
use crate::access::types::{AccessKind, EntityRef, Grant};

#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    grants: RwLock<BTreeMap<(String, String), Grant>>,
    batch_limit: Option<usize>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the batched write path with the given per-batch limit.
    pub fn with_batch_limit(limit: usize) -> Self {
        Self {
            grants: RwLock::new(BTreeMap::new()),
            batch_limit: Some(limit),
        }
    }

    pub async fn len(&self) -> usize {
        self.grants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.grants.read().await.is_empty()
    }

    /// Every stored grant, ordered by entity then node id.
    pub async fn all(&self) -> Vec<Grant> {
        self.grants.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn put(&self, grant: Grant) -> StoreResult<()> {
        let key = (grant.entity_id.clone(), grant.node_id.clone());
        self.grants.write().await.insert(key, grant);
        Ok(())
    }

    async fn delete(&self, entity_id: &str, node_id: &str) -> StoreResult<()> {
        self.grants
            .write()
            .await
            .remove(&(entity_id.to_string(), node_id.to_string()));
        Ok(())
    }

    async fn exists(&self, entity_id: &str, node_id: &str) -> StoreResult<bool> {
        Ok(self
            .grants
            .read()
            .await
            .contains_key(&(entity_id.to_string(), node_id.to_string())))
    }

    async fn by_node(&self, node_id: &str) -> StoreResult<Vec<Grant>> {
        Ok(self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| grant.node_id == node_id)
            .cloned()
            .collect())
    }

    async fn by_entity(&self, entity_id: &str) -> StoreResult<Vec<Grant>> {
        Ok(self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| grant.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn by_workspace(&self, organization_id: &str) -> StoreResult<Vec<Grant>> {
        let entity_id = EntityRef::workspace(organization_id).entity_id();
        Ok(self
            .grants
            .read()
            .await
            .values()
            .filter(|grant| grant.entity_id == entity_id && grant.access_kind == AccessKind::Workspace)
            .cloned()
            .collect())
    }

    async fn batch_put(&self, grants: Vec<Grant>) -> StoreResult<()> {
        let mut stored = self.grants.write().await;
        for grant in grants {
            stored.insert((grant.entity_id.clone(), grant.node_id.clone()), grant);
        }
        Ok(())
    }

    async fn delete_all_for_node(&self, node_id: &str) -> StoreResult<usize> {
        let mut stored = self.grants.write().await;
        let before = stored.len();
        stored.retain(|(_, node), _| node != node_id);
        Ok(before - stored.len())
    }

    fn max_batch_size(&self) -> Option<usize> {
        self.batch_limit
    }
}

#[derive(Debug, Default)]
struct Directory {
    users: HashSet<i64>,
    teams: HashMap<i64, Team>,
    memberships: HashMap<i64, HashSet<i64>>,
}

/// Users, teams and team memberships held in memory.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    directory: RwLock<Directory>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user_id: i64) {
        self.directory.write().await.users.insert(user_id);
    }

    pub async fn remove_user(&self, user_id: i64) {
        let mut directory = self.directory.write().await;
        directory.users.remove(&user_id);
        directory.memberships.remove(&user_id);
    }

    pub async fn add_team(&self, team: Team) {
        self.directory.write().await.teams.insert(team.id, team);
    }

    pub async fn remove_team(&self, team_id: i64) {
        let mut directory = self.directory.write().await;
        directory.teams.remove(&team_id);
        for teams in directory.memberships.values_mut() {
            teams.remove(&team_id);
        }
    }

    pub async fn add_member(&self, team_id: i64, user_id: i64) {
        self.directory
            .write()
            .await
            .memberships
            .entry(user_id)
            .or_default()
            .insert(team_id);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn user_exists(&self, user_id: i64) -> StoreResult<bool> {
        Ok(self.directory.read().await.users.contains(&user_id))
    }

    async fn team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>> {
        Ok(self.directory.read().await.teams.get(&team_id).cloned())
    }

    async fn teams_for_user(&self, user_id: i64, organization_id: &str) -> StoreResult<Vec<Team>> {
        let directory = self.directory.read().await;
        let Some(team_ids) = directory.memberships.get(&user_id) else {
            return Ok(Vec::new());
        };
        let mut teams: Vec<Team> = team_ids
            .iter()
            .filter_map(|id| directory.teams.get(id))
            .filter(|team| team.organization_id == organization_id)
            .cloned()
            .collect();
        teams.sort_by_key(|team| team.id);
        Ok(teams)
    }
}

/// Node ownership records held in memory.
#[derive(Debug, Default)]
pub struct MemoryNodeDirectory {
    nodes: RwLock<HashMap<String, NodeRecord>>,
}

impl MemoryNodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, node_uuid: impl Into<String>, record: NodeRecord) {
        self.nodes.write().await.insert(node_uuid.into(), record);
    }
}

#[async_trait]
impl NodeDirectory for MemoryNodeDirectory {
    async fn node_by_id(&self, node_uuid: &str) -> StoreResult<Option<NodeRecord>> {
        Ok(self.nodes.read().await.get(node_uuid).cloned())
    }
}
