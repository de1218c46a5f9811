use log::{info, warn};

use super::access_engine::AccessEngine;
use crate::access::types::{
    node_key, AccessKind, AccessScope, AccessSummary, EntityKind, EntityRef, Grant,
};
use crate::error::{AccessError, AccessResult};
use crate::stores::IdentityStore;

/// Outcome of trying to restore a missing owner grant.
enum OwnerRepair {
    Restored(Grant),
    /// The directory knew the owner but the grant could not be written
    NotPersisted { organization_id: String },
    Skipped,
}

impl AccessEngine {
    /// Builds the permission summary for a node, repairing what it can.
    ///
    /// A missing owner grant is restored from the node directory, and
    /// grants held by users or teams that no longer exist are revoked.
    /// Neither repair can fail the call: repair failures are logged and
    /// the summary reflects what is actually stored. Only the initial
    /// grant read is mandatory.
    pub async fn describe_access(&self, node_uuid: &str) -> AccessResult<AccessSummary> {
        let node_id = node_key(node_uuid);
        let grants = self
            .grants
            .by_node(&node_id)
            .await
            .map_err(AccessError::store("load node grants"))?;

        let mut owner: Option<Grant> = None;
        let mut others = Vec::new();
        for grant in grants {
            if grant.is_owner() {
                if let Some(existing) = &owner {
                    warn!(
                        "Node {} has multiple owner grants ({} and {}), using the first",
                        node_uuid, existing.entity_id, grant.entity_id
                    );
                    continue;
                }
                owner = Some(grant);
            } else {
                others.push(grant);
            }
        }

        let mut repaired_organization = None;
        if owner.is_none() {
            match self.restore_owner(node_uuid).await {
                OwnerRepair::Restored(grant) => owner = Some(grant),
                OwnerRepair::NotPersisted { organization_id } => {
                    repaired_organization = Some(organization_id)
                }
                OwnerRepair::Skipped => {}
            }
        }

        let survivors = self.drop_stale_grants(node_uuid, others).await;

        let organization_id = owner
            .as_ref()
            .map(|grant| grant.organization_id.clone())
            .or(repaired_organization)
            .or_else(|| survivors.first().map(|grant| grant.organization_id.clone()))
            .unwrap_or_default();

        if organization_id.is_empty() && !survivors.is_empty() {
            warn!(
                "Organization-independent node {} still holds {} non-owner grant(s)",
                node_uuid,
                survivors.len()
            );
        }

        Ok(AccessSummary {
            owner: owner.map(|grant| grant.raw_id).unwrap_or_default(),
            scope: AccessScope::from_grants(&survivors),
            shared_users: shared_ids(&survivors, EntityKind::User),
            shared_teams: shared_ids(&survivors, EntityKind::Team),
            organization_independent: organization_id.is_empty(),
            organization_id,
        })
    }

    /// Re-creates a self-granted owner grant from the node directory.
    async fn restore_owner(&self, node_uuid: &str) -> OwnerRepair {
        if !self.config.auto_heal {
            return OwnerRepair::Skipped;
        }
        let Some(directory) = &self.directory else {
            warn!("Node {} has no owner grant and no node directory is configured", node_uuid);
            return OwnerRepair::Skipped;
        };

        let record = match directory.node_by_id(node_uuid).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!("Node {} has no owner grant and is unknown to the directory", node_uuid);
                return OwnerRepair::Skipped;
            }
            Err(e) => {
                warn!("Directory lookup for ownerless node {} failed: {}", node_uuid, e);
                return OwnerRepair::Skipped;
            }
        };

        let grant = Grant::new(
            &EntityRef::user(record.owner_id.as_str()),
            node_uuid,
            AccessKind::Owner,
            record.organization_id.as_str(),
            record.owner_id.as_str(),
        );
        match self.grants.put(grant.clone()).await {
            Ok(()) => {
                info!(
                    "Restored owner grant for node {} (owner {}, organization '{}')",
                    node_uuid, record.owner_id, record.organization_id
                );
                OwnerRepair::Restored(grant)
            }
            Err(e) => {
                warn!("Failed to persist restored owner grant for node {}: {}", node_uuid, e);
                OwnerRepair::NotPersisted {
                    organization_id: record.organization_id,
                }
            }
        }
    }

    /// Revokes grants whose user or team no longer exists and returns the rest.
    ///
    /// Only a definite "does not exist" revokes a grant. Lookup failures,
    /// unparseable ids and failed revocations keep it.
    async fn drop_stale_grants(&self, node_uuid: &str, grants: Vec<Grant>) -> Vec<Grant> {
        if !self.config.stale_cleanup {
            return grants;
        }
        let Some(identity) = &self.identity else {
            return grants;
        };

        let mut survivors = Vec::with_capacity(grants.len());
        for grant in grants {
            if principal_exists(&**identity, &grant).await != Some(false) {
                survivors.push(grant);
                continue;
            }
            match self.grants.delete(&grant.entity_id, &grant.node_id).await {
                Ok(()) => info!(
                    "Revoked stale grant {} on node {}: principal no longer exists",
                    grant.entity_id, node_uuid
                ),
                Err(e) => {
                    warn!("Failed to revoke stale grant {} on node {}: {}", grant.entity_id, node_uuid, e);
                    survivors.push(grant);
                }
            }
        }
        survivors
    }
}

/// `Some(exists)` when the identity store gave a definite answer.
async fn principal_exists(identity: &dyn IdentityStore, grant: &Grant) -> Option<bool> {
    let lookup = match grant.entity_kind {
        EntityKind::Workspace => return Some(true),
        EntityKind::User => match grant.raw_id.parse::<i64>() {
            Ok(id) => identity.user_exists(id).await,
            Err(_) => {
                warn!("Keeping grant {} with non-numeric id", grant.entity_id);
                return None;
            }
        },
        EntityKind::Team => match grant.raw_id.parse::<i64>() {
            Ok(id) => identity.team_by_id(id).await.map(|team| team.is_some()),
            Err(_) => {
                warn!("Keeping grant {} with non-numeric id", grant.entity_id);
                return None;
            }
        },
    };
    match lookup {
        Ok(exists) => Some(exists),
        Err(e) => {
            warn!("Existence check for {} failed, keeping grant: {}", grant.entity_id, e);
            None
        }
    }
}

fn shared_ids(grants: &[Grant], kind: EntityKind) -> Vec<String> {
    let mut ids: Vec<String> = grants
        .iter()
        .filter(|grant| grant.access_kind == AccessKind::Shared && grant.entity_kind == kind)
        .map(|grant| grant.raw_id.clone())
        .collect();
    ids.sort();
    ids
}
