use async_trait::async_trait;
use log::debug;

use super::error::{StoreError, StoreResult};
use super::traits::GrantStore;
use crate::access::types::{AccessKind, EntityRef, Grant};

/// Separator between the two halves of a tree key.
const KEY_JOIN: char = '|';

/// Default number of grants written per `sled::Batch`.
pub const DEFAULT_SLED_BATCH_LIMIT: usize = 128;

/// Persistent grant store on sled.
///
/// Grants live in the `grants` tree keyed `<len>:entity_id|node_id`, so
/// entity enumeration is a prefix scan. The `grants_by_node` tree mirrors
/// every key as `<len>:node_id|entity_id` and serves node enumeration. The
/// byte length of the leading id keeps ids that contain the separator from
/// matching each other's prefix.
#[derive(Debug, Clone)]
pub struct SledGrantStore {
    db: sled::Db,
    grants_tree: sled::Tree,
    node_index_tree: sled::Tree,
    batch_limit: usize,
}

impl SledGrantStore {
    /// Opens (or creates) the grant trees in the given database.
    pub fn new(db: sled::Db) -> StoreResult<Self> {
        let grants_tree = db.open_tree("grants")?;
        let node_index_tree = db.open_tree("grants_by_node")?;
        Ok(Self {
            db,
            grants_tree,
            node_index_tree,
            batch_limit: DEFAULT_SLED_BATCH_LIMIT,
        })
    }

    #[must_use]
    pub fn with_batch_limit(mut self, batch_limit: usize) -> Self {
        self.batch_limit = batch_limit.max(1);
        self
    }

    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn primary_key(entity_id: &str, node_id: &str) -> String {
        format!("{}{}", Self::prefix(entity_id), node_id)
    }

    fn index_key(node_id: &str, entity_id: &str) -> String {
        format!("{}{}", Self::prefix(node_id), entity_id)
    }

    fn prefix(id: &str) -> String {
        format!("{}:{}{}", id.len(), id, KEY_JOIN)
    }

    fn decode(bytes: &[u8]) -> StoreResult<Grant> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn scan_grants(&self, prefix: &str) -> StoreResult<Vec<Grant>> {
        let mut grants = Vec::new();
        for entry in self.grants_tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            grants.push(Self::decode(&value)?);
        }
        Ok(grants)
    }

    /// Entity ids recorded in the node index for one node.
    fn indexed_entities(&self, node_id: &str) -> StoreResult<Vec<String>> {
        let prefix = Self::prefix(node_id);
        let mut entity_ids = Vec::new();
        for entry in self.node_index_tree.scan_prefix(prefix.as_bytes()) {
            let (key, _) = entry?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| StoreError::Serialization {
                context: "node index key".to_string(),
                reason: e.to_string(),
            })?;
            if let Some(entity_id) = key.strip_prefix(&prefix) {
                entity_ids.push(entity_id.to_string());
            }
        }
        Ok(entity_ids)
    }

    async fn flush(&self) -> StoreResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl GrantStore for SledGrantStore {
    async fn put(&self, grant: Grant) -> StoreResult<()> {
        let bytes = serde_json::to_vec(&grant)?;
        self.grants_tree
            .insert(Self::primary_key(&grant.entity_id, &grant.node_id).as_bytes(), bytes)?;
        self.node_index_tree.insert(
            Self::index_key(&grant.node_id, &grant.entity_id).as_bytes(),
            grant.entity_id.as_bytes(),
        )?;
        self.flush().await
    }

    async fn delete(&self, entity_id: &str, node_id: &str) -> StoreResult<()> {
        self.grants_tree
            .remove(Self::primary_key(entity_id, node_id).as_bytes())?;
        self.node_index_tree
            .remove(Self::index_key(node_id, entity_id).as_bytes())?;
        self.flush().await
    }

    async fn exists(&self, entity_id: &str, node_id: &str) -> StoreResult<bool> {
        Ok(self
            .grants_tree
            .contains_key(Self::primary_key(entity_id, node_id).as_bytes())?)
    }

    async fn by_node(&self, node_id: &str) -> StoreResult<Vec<Grant>> {
        let mut grants = Vec::new();
        for entity_id in self.indexed_entities(node_id)? {
            match self
                .grants_tree
                .get(Self::primary_key(&entity_id, node_id).as_bytes())?
            {
                Some(value) => grants.push(Self::decode(&value)?),
                None => debug!("Index entry {} -> {} has no grant", node_id, entity_id),
            }
        }
        Ok(grants)
    }

    async fn by_entity(&self, entity_id: &str) -> StoreResult<Vec<Grant>> {
        self.scan_grants(&Self::prefix(entity_id))
    }

    async fn by_workspace(&self, organization_id: &str) -> StoreResult<Vec<Grant>> {
        let entity_id = EntityRef::workspace(organization_id).entity_id();
        Ok(self
            .scan_grants(&Self::prefix(&entity_id))?
            .into_iter()
            .filter(|grant| grant.access_kind == AccessKind::Workspace)
            .collect())
    }

    async fn batch_put(&self, grants: Vec<Grant>) -> StoreResult<()> {
        let mut primary = sled::Batch::default();
        let mut index = sled::Batch::default();
        for grant in &grants {
            let bytes = serde_json::to_vec(grant)?;
            primary.insert(Self::primary_key(&grant.entity_id, &grant.node_id).as_bytes(), bytes);
            index.insert(
                Self::index_key(&grant.node_id, &grant.entity_id).as_bytes(),
                grant.entity_id.as_bytes(),
            );
        }
        self.grants_tree.apply_batch(primary)?;
        self.node_index_tree.apply_batch(index)?;
        self.flush().await
    }

    async fn delete_all_for_node(&self, node_id: &str) -> StoreResult<usize> {
        let entity_ids = self.indexed_entities(node_id)?;
        let mut primary = sled::Batch::default();
        let mut index = sled::Batch::default();
        for entity_id in &entity_ids {
            primary.remove(Self::primary_key(entity_id, node_id).as_bytes());
            index.remove(Self::index_key(node_id, entity_id).as_bytes());
        }
        self.grants_tree.apply_batch(primary)?;
        self.node_index_tree.apply_batch(index)?;
        self.flush().await?;
        Ok(entity_ids.len())
    }

    fn max_batch_size(&self) -> Option<usize> {
        Some(self.batch_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::types::node_key;
    use tempfile::TempDir;

    fn open_store() -> (SledGrantStore, TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = sled::Config::new()
            .path(temp_dir.path())
            .temporary(true)
            .open()
            .unwrap();
        (SledGrantStore::new(db).unwrap(), temp_dir)
    }

    fn grant(entity: EntityRef, node: &str, kind: AccessKind) -> Grant {
        Grant::new(&entity, node, kind, "org-1", "1")
    }

    #[tokio::test]
    async fn test_put_and_lookup_by_both_keys() {
        let (store, _dir) = open_store();
        store.put(grant(EntityRef::user("1"), "n1", AccessKind::Owner)).await.unwrap();
        store.put(grant(EntityRef::team("5"), "n1", AccessKind::Shared)).await.unwrap();
        store.put(grant(EntityRef::user("1"), "n2", AccessKind::Owner)).await.unwrap();

        assert!(store.exists("team#5", &node_key("n1")).await.unwrap());
        assert_eq!(store.by_node(&node_key("n1")).await.unwrap().len(), 2);
        assert_eq!(store.by_entity("user#1").await.unwrap().len(), 2);
        // `user#1` must not prefix-match `user#10`
        store.put(grant(EntityRef::user("10"), "n3", AccessKind::Owner)).await.unwrap();
        assert_eq!(store.by_entity("user#1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_index_entry() {
        let (store, _dir) = open_store();
        store.put(grant(EntityRef::team("5"), "n1", AccessKind::Shared)).await.unwrap();
        store.delete("team#5", &node_key("n1")).await.unwrap();

        assert!(!store.exists("team#5", &node_key("n1")).await.unwrap());
        assert!(store.by_node(&node_key("n1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_put_workspace_and_delete_all() {
        let (store, _dir) = open_store();
        store
            .batch_put(vec![
                grant(EntityRef::user("1"), "n1", AccessKind::Owner),
                grant(EntityRef::workspace("org-1"), "n1", AccessKind::Workspace),
                grant(EntityRef::workspace("org-1"), "n2", AccessKind::Workspace),
            ])
            .await
            .unwrap();

        assert_eq!(store.by_workspace("org-1").await.unwrap().len(), 2);
        assert_eq!(store.delete_all_for_node(&node_key("n1")).await.unwrap(), 2);
        assert!(store.by_node(&node_key("n1")).await.unwrap().is_empty());
        assert_eq!(store.by_workspace("org-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_separator_in_ids_does_not_collide() {
        let (store, _dir) = open_store();
        store.put(grant(EntityRef::user("1"), "n1", AccessKind::Owner)).await.unwrap();
        store.put(grant(EntityRef::user("1|x"), "n2", AccessKind::Shared)).await.unwrap();
        store.put(grant(EntityRef::user("2"), "n1|x", AccessKind::Owner)).await.unwrap();

        let owned = store.by_entity("user#1").await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].node_id, node_key("n1"));

        let on_n1 = store.by_node(&node_key("n1")).await.unwrap();
        assert_eq!(on_n1.len(), 1);
        assert_eq!(on_n1[0].entity_id, "user#1");

        assert!(!store.exists("user#1", &format!("x|{}", node_key("n2"))).await.unwrap());
        assert_eq!(store.delete_all_for_node(&node_key("n1")).await.unwrap(), 1);
        assert_eq!(store.by_node(&node_key("n1|x")).await.unwrap().len(), 1);
    }

    #[test]
    fn test_batch_limit_never_zero() {
        let (store, _dir) = open_store();
        assert_eq!(store.max_batch_size(), Some(DEFAULT_SLED_BATCH_LIMIT));
        assert_eq!(store.with_batch_limit(0).max_batch_size(), Some(1));
    }
}
