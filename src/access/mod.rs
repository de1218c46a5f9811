//! Access engine: authorization checks, reachable-node enumeration, scope
//! reconciliation, permission summaries with repair, and organization
//! attach/detach transitions.

pub mod access_engine;
mod maintenance;
pub mod organization;
mod reconcile;
mod summary;
pub mod types;

pub use access_engine::AccessEngine;
pub use types::{
    AccessKind, AccessScope, AccessSummary, EntityKind, EntityRef, Grant, ScopeChange,
};
