use log::{debug, info};
use std::collections::BTreeMap;

use super::access_engine::{parse_numeric_id, require_id, AccessEngine};
use crate::access::types::{node_key, AccessKind, AccessScope, EntityRef, Grant, ScopeChange};
use crate::error::{AccessError, AccessResult};

impl AccessEngine {
    /// Reconciles a node's grants with the requested scope.
    ///
    /// Grants that are not desired are revoked and missing ones are written;
    /// grants already in place are left untouched, so repeating a call
    /// performs no writes. The owner grant is never revoked.
    ///
    /// Validation (organization-independent sharing, identifier format,
    /// existence of shared users and teams) happens before any write.
    /// The read-diff-write sequence is not transactional.
    ///
    /// # Errors
    ///
    /// Besides validation and store failures, returns a state error when the
    /// node already has an owner grant for a different user or organization.
    /// An owner grant is only written when the node has none.
    pub async fn set_scope(&self, change: &ScopeChange) -> AccessResult<()> {
        require_id("node", &change.node_uuid)?;
        require_id("user", &change.owner_id)?;

        if change.organization_id.is_empty() && change.requests_sharing() {
            return Err(AccessError::IndependentNodeSharing {
                node_uuid: change.node_uuid.clone(),
            });
        }

        self.validate_principals(change).await?;

        let node_id = node_key(&change.node_uuid);
        let owner_entity_id = EntityRef::user(change.owner_id.as_str()).entity_id();
        let desired = desired_grants(change);

        let current = self
            .grants
            .by_node(&node_id)
            .await
            .map_err(AccessError::store("load node grants"))?;
        if let Some(owner) = current.iter().find(|grant| grant.is_owner()) {
            check_stored_owner(change, owner)?;
        }

        let mut revoked = 0;
        for grant in &current {
            if grant.is_owner()
                || grant.entity_id == owner_entity_id
                || desired.contains_key(&grant.entity_id)
            {
                continue;
            }
            self.grants
                .delete(&grant.entity_id, &node_id)
                .await
                .map_err(AccessError::store("revoke grant"))?;
            debug!("Revoked {} on node {}", grant.entity_id, change.node_uuid);
            revoked += 1;
        }

        let missing: Vec<Grant> = desired
            .into_iter()
            .filter(|(entity_id, _)| !current.iter().any(|grant| &grant.entity_id == entity_id))
            .map(|(_, (entity, kind))| {
                Grant::new(
                    &entity,
                    &change.node_uuid,
                    kind,
                    change.organization_id.as_str(),
                    change.actor_id.as_str(),
                )
            })
            .collect();
        let granted = missing.len();
        self.write_grants(missing).await?;

        if revoked > 0 || granted > 0 {
            info!(
                "Node {} set to {} by {}: {} revoked, {} granted",
                change.node_uuid, change.scope, change.actor_id, revoked, granted
            );
        }
        Ok(())
    }

    /// Checks that every shared user and team exists. Skipped without an
    /// identity store.
    async fn validate_principals(&self, change: &ScopeChange) -> AccessResult<()> {
        let Some(identity) = &self.identity else {
            return Ok(());
        };

        for user_id in &change.shared_users {
            let numeric_id = parse_numeric_id("user", user_id)?;
            let exists = identity
                .user_exists(numeric_id)
                .await
                .map_err(AccessError::identity("validate shared user"))?;
            if !exists {
                return Err(AccessError::UnknownPrincipal {
                    kind: "user".to_string(),
                    id: user_id.clone(),
                });
            }
        }

        for team_id in &change.shared_teams {
            let numeric_id = parse_numeric_id("team", team_id)?;
            let team = identity
                .team_by_id(numeric_id)
                .await
                .map_err(AccessError::identity("validate shared team"))?;
            if team.is_none() {
                return Err(AccessError::UnknownPrincipal {
                    kind: "team".to_string(),
                    id: team_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// The stored owner grant is authoritative over the request: the owner and
/// the organization must match, and an independent node stays unshared.
fn check_stored_owner(change: &ScopeChange, owner: &Grant) -> AccessResult<()> {
    if owner.raw_id != change.owner_id {
        return Err(AccessError::OwnerMismatch {
            node_uuid: change.node_uuid.clone(),
            owner_id: owner.raw_id.clone(),
            requested: change.owner_id.clone(),
        });
    }
    if owner.is_organization_independent() && change.requests_sharing() {
        return Err(AccessError::IndependentNodeSharing {
            node_uuid: change.node_uuid.clone(),
        });
    }
    if owner.organization_id != change.organization_id {
        return Err(AccessError::OrganizationMismatch {
            node_uuid: change.node_uuid.clone(),
            organization_id: owner.organization_id.clone(),
            requested: change.organization_id.clone(),
        });
    }
    Ok(())
}

/// Desired grants keyed by entity id. The owner is always present; the
/// workspace or the shared users and teams are added according to scope.
fn desired_grants(change: &ScopeChange) -> BTreeMap<String, (EntityRef, AccessKind)> {
    let mut desired = BTreeMap::new();
    let owner = EntityRef::user(change.owner_id.as_str());
    desired.insert(owner.entity_id(), (owner, AccessKind::Owner));

    let mut add = |entity: EntityRef, kind: AccessKind| {
        desired.entry(entity.entity_id()).or_insert((entity, kind));
    };

    match change.scope {
        AccessScope::Private => {}
        AccessScope::Workspace => {
            add(EntityRef::workspace(change.organization_id.as_str()), AccessKind::Workspace);
        }
        AccessScope::Shared => {
            for user_id in &change.shared_users {
                add(EntityRef::user(user_id.trim()), AccessKind::Shared);
            }
            for team_id in &change.shared_teams {
                add(EntityRef::team(team_id.trim()), AccessKind::Shared);
            }
        }
    }
    desired
}
