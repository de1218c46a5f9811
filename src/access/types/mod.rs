pub mod entity;
pub mod grant;
pub mod scope;

pub use entity::{node_key, node_uuid_from_key, EntityKind, EntityRef};
pub use grant::{AccessKind, Grant};
pub use scope::{AccessScope, AccessSummary, ScopeChange};
