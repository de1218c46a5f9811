use serde::{Deserialize, Serialize};

/// A team as known to the identity store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub organization_id: String,
}

/// Authoritative ownership record for a node, used to restore a lost owner grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub owner_id: String,
    /// Empty for organization-independent nodes.
    pub organization_id: String,
}
