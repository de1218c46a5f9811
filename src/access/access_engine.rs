use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::access::types::{node_key, EntityRef, Grant};
use crate::config::AccessConfig;
use crate::error::{AccessError, AccessResult};
use crate::stores::{GrantStore, IdentityStore, NodeDirectory};

/// Decides who may reach a node and keeps a node's grants consistent with
/// its sharing scope and organization binding.
///
/// The grant store is mandatory. The identity store and node directory are
/// optional enrichments: when absent, team-based access, principal
/// validation, stale-grant cleanup and owner repair are skipped.
///
/// The engine holds no mutable state; every call is a short sequence of
/// store round-trips, and concurrent calls on the same node are
/// last-writer-wins per grant.
#[derive(Debug, Clone)]
pub struct AccessEngine {
    pub(crate) grants: Arc<dyn GrantStore>,
    pub(crate) identity: Option<Arc<dyn IdentityStore>>,
    pub(crate) directory: Option<Arc<dyn NodeDirectory>>,
    pub(crate) config: AccessConfig,
}

impl AccessEngine {
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self {
            grants,
            identity: None,
            directory: None,
            config: AccessConfig::default(),
        }
    }

    #[must_use]
    pub fn with_identity_store(mut self, identity: Arc<dyn IdentityStore>) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub fn with_node_directory(mut self, directory: Arc<dyn NodeDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: AccessConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Returns true if the user may reach the node.
    ///
    /// Checked in order, stopping at the first match:
    /// 1. a grant held by the user directly
    /// 2. a workspace grant for `organization_id`
    /// 3. a grant held by any team the user belongs to in that organization
    ///
    /// Organization-independent nodes (empty `organization_id`) stop after
    /// step 1. Grant-store failures in steps 1 and 2 are returned as errors;
    /// any failure while resolving or checking teams denies that path only.
    pub async fn check_access(
        &self,
        user_id: &str,
        node_uuid: &str,
        organization_id: &str,
    ) -> AccessResult<bool> {
        let node_id = node_key(node_uuid);

        let user = EntityRef::user(user_id);
        if self
            .grants
            .exists(&user.entity_id(), &node_id)
            .await
            .map_err(AccessError::store("check direct grant"))?
        {
            debug!("User {} has a direct grant on node {}", user_id, node_uuid);
            return Ok(true);
        }

        if organization_id.is_empty() {
            debug!("Node {} is organization-independent, denying {}", node_uuid, user_id);
            return Ok(false);
        }

        let workspace = EntityRef::workspace(organization_id);
        if self
            .grants
            .exists(&workspace.entity_id(), &node_id)
            .await
            .map_err(AccessError::store("check workspace grant"))?
        {
            debug!("Node {} is shared with workspace {}", node_uuid, organization_id);
            return Ok(true);
        }

        Ok(self.check_team_access(user_id, &node_id, organization_id).await)
    }

    async fn check_team_access(&self, user_id: &str, node_id: &str, organization_id: &str) -> bool {
        let team_ids = self.team_entity_ids(user_id, organization_id).await;
        if team_ids.is_empty() {
            return false;
        }

        let chunk_size = self.batch_size().unwrap_or(team_ids.len()).max(1);
        for chunk in team_ids.chunks(chunk_size) {
            match self.grants.batch_check(chunk, node_id).await {
                Ok(true) => {
                    debug!("User {} reaches {} through a team grant", user_id, node_id);
                    return true;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        "Team grant check for user {} on {} failed, denying team path: {}",
                        user_id, node_id, e
                    );
                    return false;
                }
            }
        }
        false
    }

    /// Every node the user may reach within the organization: nodes granted
    /// to the user, to the organization's workspace, or to the user's teams.
    pub async fn reachable_nodes(
        &self,
        user_id: &str,
        organization_id: &str,
    ) -> AccessResult<HashSet<String>> {
        let mut nodes = HashSet::new();

        let direct = self
            .grants
            .by_entity(&EntityRef::user(user_id).entity_id())
            .await
            .map_err(AccessError::store("list user grants"))?;
        nodes.extend(direct.iter().map(|grant| grant.node_uuid().to_string()));

        if organization_id.is_empty() {
            return Ok(nodes);
        }

        let workspace = self
            .grants
            .by_workspace(organization_id)
            .await
            .map_err(AccessError::store("list workspace grants"))?;
        nodes.extend(workspace.iter().map(|grant| grant.node_uuid().to_string()));

        for team_id in self.team_entity_ids(user_id, organization_id).await {
            let team_grants = self
                .grants
                .by_entity(&team_id)
                .await
                .map_err(AccessError::store("list team grants"))?;
            nodes.extend(team_grants.iter().map(|grant| grant.node_uuid().to_string()));
        }

        debug!(
            "User {} reaches {} node(s) in organization {}",
            user_id,
            nodes.len(),
            organization_id
        );
        Ok(nodes)
    }

    /// Composite ids of the user's teams in the organization. Empty when no
    /// identity store is configured or the lookup fails.
    async fn team_entity_ids(&self, user_id: &str, organization_id: &str) -> Vec<String> {
        let Some(identity) = &self.identity else {
            return Vec::new();
        };
        let Ok(numeric_id) = user_id.parse::<i64>() else {
            warn!("Skipping team lookup for non-numeric user id '{}'", user_id);
            return Vec::new();
        };
        match identity.teams_for_user(numeric_id, organization_id).await {
            Ok(teams) => teams
                .iter()
                .map(|team| EntityRef::team(team.id.to_string()).entity_id())
                .collect(),
            Err(e) => {
                warn!(
                    "Team lookup for user {} in organization {} failed: {}",
                    user_id, organization_id, e
                );
                Vec::new()
            }
        }
    }

    /// Effective batch size, or `None` when the store cannot batch.
    pub(crate) fn batch_size(&self) -> Option<usize> {
        self.grants
            .max_batch_size()
            .map(|limit| limit.min(self.config.max_batch_size).max(1))
    }

    /// Writes grants through the batched path in sequential chunks, or one
    /// by one when the store has no batched path.
    pub(crate) async fn write_grants(&self, grants: Vec<Grant>) -> AccessResult<()> {
        if grants.is_empty() {
            return Ok(());
        }
        match self.batch_size() {
            Some(size) => {
                for chunk in grants.chunks(size) {
                    self.grants
                        .batch_put(chunk.to_vec())
                        .await
                        .map_err(AccessError::store("batch grant"))?;
                }
            }
            None => {
                for grant in grants {
                    self.grants
                        .put(grant)
                        .await
                        .map_err(AccessError::store("grant"))?;
                }
            }
        }
        Ok(())
    }

    /// The node's owner grant, if any.
    pub(crate) async fn owner_grant(&self, node_id: &str) -> AccessResult<Option<Grant>> {
        let grants = self
            .grants
            .by_node(node_id)
            .await
            .map_err(AccessError::store("load node grants"))?;
        Ok(grants.into_iter().find(Grant::is_owner))
    }
}

/// Rejects empty identifiers.
pub(crate) fn require_id(kind: &str, id: &str) -> AccessResult<()> {
    if id.trim().is_empty() {
        return Err(AccessError::InvalidIdentifier {
            kind: kind.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Parses an identity-store id, which is always numeric.
pub(crate) fn parse_numeric_id(kind: &str, id: &str) -> AccessResult<i64> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| AccessError::InvalidIdentifier {
            kind: kind.to_string(),
            id: id.to_string(),
        })
}
