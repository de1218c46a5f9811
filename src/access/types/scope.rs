use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::grant::{AccessKind, Grant};

/// Derived sharing state of a node. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Private,
    Shared,
    Workspace,
}

impl AccessScope {
    /// Workspace wins over shared, shared wins over private.
    pub fn from_grants<'a, I>(grants: I) -> Self
    where
        I: IntoIterator<Item = &'a Grant>,
    {
        let mut scope = AccessScope::Private;
        for grant in grants {
            match grant.access_kind {
                AccessKind::Workspace => return AccessScope::Workspace,
                AccessKind::Shared => scope = AccessScope::Shared,
                AccessKind::Owner => {}
            }
        }
        scope
    }
}

impl fmt::Display for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessScope::Private => f.write_str("private"),
            AccessScope::Shared => f.write_str("shared"),
            AccessScope::Workspace => f.write_str("workspace"),
        }
    }
}

impl FromStr for AccessScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(AccessScope::Private),
            "shared" => Ok(AccessScope::Shared),
            "workspace" => Ok(AccessScope::Workspace),
            other => Err(format!("unknown access scope '{}'", other)),
        }
    }
}

/// Desired sharing state for a node, as submitted by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeChange {
    pub node_uuid: String,
    pub scope: AccessScope,
    #[serde(default)]
    pub shared_users: Vec<String>,
    #[serde(default)]
    pub shared_teams: Vec<String>,
    pub owner_id: String,
    pub organization_id: String,
    pub actor_id: String,
}

impl ScopeChange {
    /// A change to `private` with no shares, attributed to the owner.
    pub fn private(
        node_uuid: impl Into<String>,
        owner_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        let owner_id = owner_id.into();
        Self {
            node_uuid: node_uuid.into(),
            scope: AccessScope::Private,
            shared_users: Vec::new(),
            shared_teams: Vec::new(),
            actor_id: owner_id.clone(),
            owner_id,
            organization_id: organization_id.into(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: AccessScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_shared_users<I, S>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_users = users.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_shared_teams<I, S>(mut self, teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_teams = teams.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    fn has_shares(&self) -> bool {
        !self.shared_users.is_empty() || !self.shared_teams.is_empty()
    }

    /// True if this change would give anyone but the owner access.
    #[must_use]
    pub fn requests_sharing(&self) -> bool {
        self.scope != AccessScope::Private || self.has_shares()
    }
}

/// Human-readable permission summary for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSummary {
    /// Owner's raw user id; empty when no owner grant could be found or restored.
    pub owner: String,
    pub scope: AccessScope,
    pub shared_users: Vec<String>,
    pub shared_teams: Vec<String>,
    pub organization_id: String,
    pub organization_independent: bool,
}
