//! Persistence trait and the shared document/filter model.

use std::collections::BTreeMap;

use {
    async_trait::async_trait,
    serde::{Serialize, de::DeserializeOwned},
    serde_json::Value,
};

use crate::{Error, Result};

/// A stored JSON object and its bookkeeping columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub data: Value,
    /// Insertion time in epoch milliseconds.
    pub created_at: i64,
}

impl Document {
    pub(crate) fn new(collection: &str, data: Value, created_at: i64) -> Result<Self> {
        if !data.is_object() {
            return Err(Error::invalid_document(&data));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            collection: collection.to_string(),
            data,
            created_at,
        })
    }

    /// Deserialize the body into a typed record.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }
}

/// Conjunction of top-level field equalities. An empty filter matches all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }
}

/// Backend for command-owned document collections.
///
/// Reads issued after a write from the same caller must observe that write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store a JSON object in `collection`.
    async fn insert(&self, collection: &str, data: Value) -> Result<Document>;

    /// Documents of `collection` matching `filter`, oldest first.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Delete matching documents and return how many were removed.
    async fn delete(&self, collection: &str, filter: &Filter) -> Result<u64>;
}
