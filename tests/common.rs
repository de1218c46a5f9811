//! Common test utilities and fixtures for access engine tests
//!
//! Provides an instrumented grant store that counts writes and can be told to
//! fail, an identity store that can be switched into a failing mode, and a
//! fixture wiring both into an engine.

#![allow(dead_code)]

use async_trait::async_trait;
use node_access::access::types::node_key;
use node_access::stores::{StoreError, StoreResult};
use node_access::{
    AccessEngine, AccessKind, EntityRef, Grant, GrantStore, IdentityStore, MemoryGrantStore,
    MemoryIdentityStore, MemoryNodeDirectory, Team,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Grant store wrapper that records write traffic and injects failures.
#[derive(Debug, Default)]
pub struct InstrumentedGrantStore {
    inner: MemoryGrantStore,
    pub puts: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub batch_items: AtomicUsize,
    pub deletes: AtomicUsize,
    pub fail_puts: AtomicBool,
    pub fail_batch_check: AtomicBool,
    pub fail_deletes: AtomicBool,
    /// `exists` fails for entity ids starting with this prefix
    fail_exists_for: Mutex<Option<String>>,
}

impl InstrumentedGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_limit(limit: usize) -> Self {
        Self {
            inner: MemoryGrantStore::with_batch_limit(limit),
            ..Self::default()
        }
    }

    /// Grants written or deleted since the last reset.
    pub fn writes(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
            + self.batch_items.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.puts.store(0, Ordering::SeqCst);
        self.batch_calls.store(0, Ordering::SeqCst);
        self.batch_items.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
    }

    pub fn fail_exists_for(&self, entity_prefix: Option<&str>) {
        *self.fail_exists_for.lock().unwrap() = entity_prefix.map(str::to_string);
    }

    pub async fn all(&self) -> Vec<Grant> {
        self.inner.all().await
    }

    /// Grants on one node as sorted `(entity_id, access_kind)` pairs.
    pub async fn node_grants(&self, node_uuid: &str) -> Vec<(String, AccessKind)> {
        let mut grants: Vec<(String, AccessKind)> = self
            .inner
            .by_node(&node_key(node_uuid))
            .await
            .unwrap()
            .into_iter()
            .map(|grant| (grant.entity_id, grant.access_kind))
            .collect();
        grants.sort_by(|a, b| a.0.cmp(&b.0));
        grants
    }

    /// Seeds a grant without counting it as engine traffic.
    pub async fn seed(&self, grant: Grant) {
        self.inner.put(grant).await.unwrap();
    }
}

#[async_trait]
impl GrantStore for InstrumentedGrantStore {
    async fn put(&self, grant: Grant) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::backend("put", "injected failure"));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(grant).await
    }

    async fn delete(&self, entity_id: &str, node_id: &str) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::backend("delete", "injected failure"));
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(entity_id, node_id).await
    }

    async fn exists(&self, entity_id: &str, node_id: &str) -> StoreResult<bool> {
        let failing = self
            .fail_exists_for
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|prefix| entity_id.starts_with(prefix));
        if failing {
            return Err(StoreError::backend("exists", "injected failure"));
        }
        self.inner.exists(entity_id, node_id).await
    }

    async fn by_node(&self, node_id: &str) -> StoreResult<Vec<Grant>> {
        self.inner.by_node(node_id).await
    }

    async fn by_entity(&self, entity_id: &str) -> StoreResult<Vec<Grant>> {
        self.inner.by_entity(entity_id).await
    }

    async fn by_workspace(&self, organization_id: &str) -> StoreResult<Vec<Grant>> {
        self.inner.by_workspace(organization_id).await
    }

    async fn batch_check(&self, entity_ids: &[String], node_id: &str) -> StoreResult<bool> {
        if self.fail_batch_check.load(Ordering::SeqCst) {
            return Err(StoreError::backend("batch_check", "injected failure"));
        }
        self.inner.batch_check(entity_ids, node_id).await
    }

    async fn batch_put(&self, grants: Vec<Grant>) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::backend("batch_put", "injected failure"));
        }
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_items.fetch_add(grants.len(), Ordering::SeqCst);
        self.inner.batch_put(grants).await
    }

    async fn delete_all_for_node(&self, node_id: &str) -> StoreResult<usize> {
        let removed = self.inner.delete_all_for_node(node_id).await?;
        self.deletes.fetch_add(removed, Ordering::SeqCst);
        Ok(removed)
    }

    fn max_batch_size(&self) -> Option<usize> {
        self.inner.max_batch_size()
    }
}

/// Identity store that can be switched into failing every lookup.
#[derive(Debug, Default)]
pub struct FlakyIdentityStore {
    pub inner: MemoryIdentityStore,
    pub failing: AtomicBool,
}

impl FlakyIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::backend(operation, "identity database unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for FlakyIdentityStore {
    async fn user_exists(&self, user_id: i64) -> StoreResult<bool> {
        self.check("user_exists")?;
        self.inner.user_exists(user_id).await
    }

    async fn team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>> {
        self.check("team_by_id")?;
        self.inner.team_by_id(team_id).await
    }

    async fn teams_for_user(&self, user_id: i64, organization_id: &str) -> StoreResult<Vec<Team>> {
        self.check("teams_for_user")?;
        self.inner.teams_for_user(user_id, organization_id).await
    }
}

/// Engine wired to instrumented collaborators.
pub struct TestFixture {
    pub engine: AccessEngine,
    pub store: Arc<InstrumentedGrantStore>,
    pub identity: Arc<FlakyIdentityStore>,
    pub directory: Arc<MemoryNodeDirectory>,
}

impl TestFixture {
    /// Fixture whose store has a batched write path.
    pub fn new() -> Self {
        Self::with_store(InstrumentedGrantStore::with_batch_limit(25))
    }

    pub fn with_store(store: InstrumentedGrantStore) -> Self {
        init_logging();
        let store = Arc::new(store);
        let identity = Arc::new(FlakyIdentityStore::new());
        let directory = Arc::new(MemoryNodeDirectory::new());
        let engine = AccessEngine::new(store.clone())
            .with_identity_store(identity.clone())
            .with_node_directory(directory.clone());
        Self {
            engine,
            store,
            identity,
            directory,
        }
    }

    /// Registers users and a team with the given members in one organization.
    pub async fn add_team(&self, team_id: i64, organization_id: &str, members: &[i64]) {
        self.identity
            .inner
            .add_team(Team {
                id: team_id,
                name: format!("team-{}", team_id),
                organization_id: organization_id.to_string(),
            })
            .await;
        for member in members {
            self.identity.inner.add_user(*member).await;
            self.identity.inner.add_member(team_id, *member).await;
        }
    }

    pub async fn add_users(&self, users: &[i64]) {
        for user in users {
            self.identity.inner.add_user(*user).await;
        }
    }

    /// Seeds an owner grant as node creation would.
    pub async fn create_node(&self, node_uuid: &str, owner_id: &str, organization_id: &str) {
        self.store
            .seed(Grant::new(
                &EntityRef::user(owner_id),
                node_uuid,
                AccessKind::Owner,
                organization_id,
                owner_id,
            ))
            .await;
    }
}

pub fn new_node_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
