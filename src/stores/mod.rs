//! Collaborator contracts consumed by the access engine, with bundled
//! in-memory and sled-backed implementations.

pub mod error;
pub mod memory;
pub mod sled_store;
pub mod traits;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryGrantStore, MemoryIdentityStore, MemoryNodeDirectory};
pub use sled_store::SledGrantStore;
pub use traits::{GrantStore, IdentityStore, NodeDirectory};
pub use types::{NodeRecord, Team};
