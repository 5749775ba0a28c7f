//! In-memory document store.

use std::{collections::HashMap, sync::Mutex};

use {async_trait::async_trait, ivebot_common::time::unix_now_ms, serde_json::Value};

use crate::{
    Result,
    store::{Document, DocumentStore, Filter},
};

/// `HashMap`-backed store. Nothing survives a restart.
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<Document> {
        let doc = Document::new(collection, data, unix_now_ms())?;
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.matches(&d.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(&d.data));
        Ok((before - docs.len()) as u64)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[tokio::test]
    async fn insert_then_find_sees_write() {
        let store = MemoryStore::new();
        let doc = store
            .insert("warnings", json!({"warnedId": "1", "reason": "spam"}))
            .await
            .unwrap();

        let found = store
            .find("warnings", &Filter::new().eq("warnedId", "1"))
            .await
            .unwrap();
        assert_eq!(found, vec![doc]);
    }

    #[tokio::test]
    async fn find_preserves_insertion_order() {
        let store = MemoryStore::new();
        for i in 0..3 {
            store.insert("c", json!({"n": i})).await.unwrap();
        }
        let found = store.find("c", &Filter::new()).await.unwrap();
        let ns: Vec<i64> = found.iter().map(|d| d.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn delete_only_matching() {
        let store = MemoryStore::new();
        store.insert("c", json!({"u": "a"})).await.unwrap();
        store.insert("c", json!({"u": "b"})).await.unwrap();
        store.insert("c", json!({"u": "a"})).await.unwrap();

        let removed = store.delete("c", &Filter::new().eq("u", "a")).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.find("c", &Filter::new()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_unknown_collection_is_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.delete("none", &Filter::new()).await.unwrap(), 0);
    }
}
