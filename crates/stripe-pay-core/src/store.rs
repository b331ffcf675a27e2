//! Document Storage
//!
//! Persistence seam for desk documents. Records travel as JSON so the same
//! trait fronts the in-memory store and the HTTP resource API.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::document::{Document, DocumentKind};
use crate::error::{PayError, Result};

/// Document storage trait
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by name
    async fn get(&self, kind: DocumentKind, name: &str) -> Result<Option<Value>>;

    /// Insert or overwrite a document
    async fn put(&self, kind: DocumentKind, name: &str, doc: Value) -> Result<()>;

    /// Names of documents whose top-level `field` equals `value`
    async fn find(&self, kind: DocumentKind, field: &str, value: &str) -> Result<Vec<String>>;
}

/// Load and decode a typed document
pub async fn load<D, S>(store: &S, name: &str) -> Result<Option<D>>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    match store.get(D::KIND, name).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Load a typed document, failing with [`PayError::NotFound`] if absent
pub async fn load_existing<D, S>(store: &S, name: &str) -> Result<D>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    load(store, name).await?.ok_or_else(|| PayError::NotFound {
        doctype: D::KIND.doctype().to_string(),
        name: name.to_string(),
    })
}

/// Encode and persist a typed document
pub async fn save<D, S>(store: &S, doc: &D) -> Result<()>
where
    D: Document,
    S: DocumentStore + ?Sized,
{
    let value = serde_json::to_value(doc)?;
    store.put(D::KIND, doc.name(), value).await
}

/// In-memory document store (for development and tests)
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<(DocumentKind, String), Value>>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored documents of every kind
    pub fn len(&self) -> usize {
        self.docs.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> PayError {
    PayError::Store("document store lock poisoned".into())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, kind: DocumentKind, name: &str) -> Result<Option<Value>> {
        let docs = self.docs.read().map_err(poisoned)?;
        Ok(docs.get(&(kind, name.to_string())).cloned())
    }

    async fn put(&self, kind: DocumentKind, name: &str, mut doc: Value) -> Result<()> {
        // a stored document is no longer local
        if let Some(obj) = doc.as_object_mut() {
            obj.remove("__islocal");
        }

        let mut docs = self.docs.write().map_err(poisoned)?;
        docs.insert((kind, name.to_string()), doc);
        Ok(())
    }

    async fn find(&self, kind: DocumentKind, field: &str, value: &str) -> Result<Vec<String>> {
        let docs = self.docs.read().map_err(poisoned)?;
        let mut names: Vec<String> = docs
            .iter()
            .filter(|((k, _), doc)| *k == kind && doc.get(field).and_then(Value::as_str) == Some(value))
            .map(|((_, name), _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
