//! Ownership and sharing of compute nodes across users, teams and
//! organization workspaces.
//!
//! [`AccessEngine`] is the entry point. It consumes a [`GrantStore`] and,
//! optionally, an [`IdentityStore`] and a [`NodeDirectory`]; bundled
//! implementations live in [`stores`].

pub mod access;
pub mod config;
pub mod error;
pub mod logging;
pub mod stores;

pub use access::{
    AccessEngine, AccessKind, AccessScope, AccessSummary, EntityKind, EntityRef, Grant,
    ScopeChange,
};
pub use config::{AccessConfig, RetryPolicy};
pub use error::{AccessError, AccessResult, ErrorCategory};
pub use stores::{
    GrantStore, IdentityStore, MemoryGrantStore, MemoryIdentityStore, MemoryNodeDirectory,
    NodeDirectory, NodeRecord, SledGrantStore, StoreError, Team,
};
