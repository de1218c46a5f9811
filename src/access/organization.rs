//! Organization attach/detach transitions.
//!
//! A node is either `Independent` (owner grant with an empty organization)
//! or `Bound` (owner grant carrying an organization id, possibly alongside
//! shared and workspace grants). Both transitions revoke the old owner
//! grant before writing its replacement; a failure in between leaves the
//! node ownerless until [`AccessEngine::describe_access`] restores it.

use log::info;

use super::access_engine::{require_id, AccessEngine};
use crate::access::types::{node_key, AccessKind, EntityRef, Grant};
use crate::error::{AccessError, AccessResult};

impl AccessEngine {
    /// Binds an organization-independent node to an organization.
    ///
    /// Only the owner may attach. Returns the replacement owner grant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `organization_id` is empty
    /// - the actor holds no grant on the node, or is not its owner (forbidden)
    /// - the node has no owner grant, or is already bound to an organization
    pub async fn attach_to_organization(
        &self,
        node_uuid: &str,
        organization_id: &str,
        actor_id: &str,
    ) -> AccessResult<Grant> {
        require_id("node", node_uuid)?;
        if organization_id.is_empty() {
            return Err(AccessError::MissingOrganization {
                operation: "attach".to_string(),
            });
        }

        let node_id = node_key(node_uuid);
        let actor = EntityRef::user(actor_id);
        let holds_grant = self
            .grants
            .exists(&actor.entity_id(), &node_id)
            .await
            .map_err(AccessError::store("check actor grant"))?;
        if !holds_grant {
            return Err(AccessError::forbidden(actor_id, "attach", node_uuid));
        }

        let owner = self
            .owner_grant(&node_id)
            .await?
            .ok_or_else(|| AccessError::MissingOwner {
                node_uuid: node_uuid.to_string(),
            })?;
        if owner.raw_id != actor_id {
            return Err(AccessError::forbidden(actor_id, "attach", node_uuid));
        }
        if !owner.is_organization_independent() {
            return Err(AccessError::AlreadyHasOrganization {
                node_uuid: node_uuid.to_string(),
                organization_id: owner.organization_id,
            });
        }

        self.grants
            .delete(&owner.entity_id, &node_id)
            .await
            .map_err(AccessError::store("revoke owner grant"))?;
        let replacement = Grant::new(
            &owner.entity(),
            node_uuid,
            AccessKind::Owner,
            organization_id,
            actor_id,
        );
        self.grants
            .put(replacement.clone())
            .await
            .map_err(AccessError::store("grant owner"))?;

        info!("Node {} attached to organization {} by {}", node_uuid, organization_id, actor_id);
        Ok(replacement)
    }

    /// Makes a bound node organization-independent.
    ///
    /// Every grant on the node is revoked, sharing included, and a fresh
    /// owner grant attributed to the previous owner is written. Returns the
    /// replacement owner grant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the actor is not the node's owner (forbidden)
    /// - the node has no owner grant, or is already organization-independent
    pub async fn detach_from_organization(
        &self,
        node_uuid: &str,
        actor_id: &str,
    ) -> AccessResult<Grant> {
        require_id("node", node_uuid)?;

        let node_id = node_key(node_uuid);
        let owner = self
            .owner_grant(&node_id)
            .await?
            .ok_or_else(|| AccessError::MissingOwner {
                node_uuid: node_uuid.to_string(),
            })?;
        if owner.raw_id != actor_id {
            return Err(AccessError::forbidden(actor_id, "detach", node_uuid));
        }
        if owner.is_organization_independent() {
            return Err(AccessError::AlreadyIndependent {
                node_uuid: node_uuid.to_string(),
            });
        }

        let removed = self
            .grants
            .delete_all_for_node(&node_id)
            .await
            .map_err(AccessError::store("revoke node grants"))?;
        let replacement = Grant::new(
            &owner.entity(),
            node_uuid,
            AccessKind::Owner,
            "",
            owner.raw_id.as_str(),
        );
        self.grants
            .put(replacement.clone())
            .await
            .map_err(AccessError::store("grant owner"))?;

        info!(
            "Node {} detached from organization {} by {} ({} grant(s) revoked)",
            node_uuid, owner.organization_id, actor_id, removed
        );
        Ok(replacement)
    }
}
