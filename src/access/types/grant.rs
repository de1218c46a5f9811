use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{node_key, node_uuid_from_key, EntityKind, EntityRef};

/// The capacity in which an entity holds a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Owner,
    Shared,
    Workspace,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Owner => f.write_str("owner"),
            AccessKind::Shared => f.write_str("shared"),
            AccessKind::Workspace => f.write_str("workspace"),
        }
    }
}

/// A persisted record stating that one entity may access one node.
///
/// `entity_id` and `node_id` form the primary key. `entity_kind` and `raw_id`
/// are denormalized copies of the entity id for display and index filtering.
/// An empty `organization_id` marks the grant as belonging to an
/// organization-independent node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub entity_id: String,
    pub node_id: String,
    pub entity_kind: EntityKind,
    pub raw_id: String,
    pub access_kind: AccessKind,
    pub organization_id: String,
    pub granted_at: DateTime<Utc>,
    pub granted_by: String,
}

impl Grant {
    /// Builds a grant stamped with the current time.
    pub fn new(
        entity: &EntityRef,
        node_uuid: &str,
        access_kind: AccessKind,
        organization_id: impl Into<String>,
        granted_by: impl Into<String>,
    ) -> Self {
        Self {
            entity_id: entity.entity_id(),
            node_id: node_key(node_uuid),
            entity_kind: entity.kind(),
            raw_id: entity.raw_id().to_string(),
            access_kind,
            organization_id: organization_id.into(),
            granted_at: Utc::now(),
            granted_by: granted_by.into(),
        }
    }

    #[must_use]
    pub fn entity(&self) -> EntityRef {
        match self.entity_kind {
            EntityKind::User => EntityRef::User(self.raw_id.clone()),
            EntityKind::Team => EntityRef::Team(self.raw_id.clone()),
            EntityKind::Workspace => EntityRef::Workspace(self.raw_id.clone()),
        }
    }

    #[must_use]
    pub fn node_uuid(&self) -> &str {
        node_uuid_from_key(&self.node_id)
    }

    /// True for the structural owner grant (a user holding `owner`).
    #[must_use]
    pub fn is_owner(&self) -> bool {
        self.access_kind == AccessKind::Owner && self.entity_kind == EntityKind::User
    }

    #[must_use]
    pub fn is_organization_independent(&self) -> bool {
        self.organization_id.is_empty()
    }
}
