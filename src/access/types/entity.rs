use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the kind tag and the raw id in composite keys.
pub const KEY_SEPARATOR: char = '#';

/// Prefix used for node keys in the grant store.
pub const NODE_PREFIX: &str = "node";

/// The kind of principal a grant is issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Team,
    Workspace,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Team => "team",
            EntityKind::Workspace => "workspace",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(EntityKind::User),
            "team" => Ok(EntityKind::Team),
            "workspace" => Ok(EntityKind::Workspace),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// A principal that can be the subject of a grant.
///
/// Workspaces are keyed by their organization id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum EntityRef {
    User(String),
    Team(String),
    Workspace(String),
}

impl EntityRef {
    pub fn user(id: impl Into<String>) -> Self {
        EntityRef::User(id.into())
    }

    pub fn team(id: impl Into<String>) -> Self {
        EntityRef::Team(id.into())
    }

    pub fn workspace(organization_id: impl Into<String>) -> Self {
        EntityRef::Workspace(organization_id.into())
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::User(_) => EntityKind::User,
            EntityRef::Team(_) => EntityKind::Team,
            EntityRef::Workspace(_) => EntityKind::Workspace,
        }
    }

    #[must_use]
    pub fn raw_id(&self) -> &str {
        match self {
            EntityRef::User(id) | EntityRef::Team(id) | EntityRef::Workspace(id) => id,
        }
    }

    /// Composite store key, e.g. `user#42`.
    #[must_use]
    pub fn entity_id(&self) -> String {
        format!("{}{}{}", self.kind(), KEY_SEPARATOR, self.raw_id())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.kind(), KEY_SEPARATOR, self.raw_id())
    }
}

impl FromStr for EntityRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, raw) = s
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| format!("entity id '{}' has no kind prefix", s))?;
        Ok(match kind.parse::<EntityKind>()? {
            EntityKind::User => EntityRef::User(raw.to_string()),
            EntityKind::Team => EntityRef::Team(raw.to_string()),
            EntityKind::Workspace => EntityRef::Workspace(raw.to_string()),
        })
    }
}

/// Composite store key for a node, e.g. `node#5f1c...`.
#[must_use]
pub fn node_key(node_uuid: &str) -> String {
    format!("{}{}{}", NODE_PREFIX, KEY_SEPARATOR, node_uuid)
}

/// Inverse of [`node_key`]. Keys without the node prefix are returned as-is.
#[must_use]
pub fn node_uuid_from_key(node_id: &str) -> &str {
    node_id
        .split_once(KEY_SEPARATOR)
        .filter(|(prefix, _)| *prefix == NODE_PREFIX)
        .map_or(node_id, |(_, uuid)| uuid)
}
