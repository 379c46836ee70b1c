//! Documents over a flat key-value store.
//!
//! Same layout as the board's Spin store: each document lives at
//! `"{collection}:{id}"` as JSON and each collection keeps an id index at
//! `"{collection}_list"`. Queries scan the index. Batch updates are applied
//! one document at a time and are not atomic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use spin_sdk::key_value::Store;

use crate::config::{collection_list_key, document_key};
use crate::core::backend::{apply_updates, matches_all, DocumentStore, FieldUpdate, Filter};
use crate::core::errors::{ClientError, Result};
use crate::models::Document;

pub trait KeyValue {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

impl KeyValue for Store {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(Store::get(self, key)?)
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(Store::set(self, key, value)?)
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(Store::delete(self, key)?)
    }
}

/// Opens the component's default Spin key-value store as a document store.
pub fn open_default_store() -> anyhow::Result<KvDocumentStore<Store>> {
    Ok(KvDocumentStore::new(Store::open_default()?))
}

#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|_| anyhow::anyhow!("lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow::anyhow!("lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow::anyhow!("lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

pub struct KvDocumentStore<S> {
    kv: S,
    // serializes index read-modify-write cycles within this process
    writes: Mutex<()>,
}

impl<S: KeyValue> KvDocumentStore<S> {
    pub fn new(kv: S) -> Self {
        KvDocumentStore { kv, writes: Mutex::new(()) }
    }

    pub fn inner(&self) -> &S {
        &self.kv
    }

    fn ids(&self, collection: &str) -> Result<Vec<String>> {
        match self.kv.get(&collection_list_key(collection))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn load(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        match self.kv.get(&document_key(collection, id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn store(&self, collection: &str, id: &str, doc: &Document) -> Result<()> {
        let bytes = serde_json::to_vec(doc)?;
        self.kv.set(&document_key(collection, id), &bytes)?;
        Ok(())
    }

    fn modify(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<()> {
        let mut doc = self
            .load(collection, id)?
            .ok_or_else(|| ClientError::io(format!("no document {}/{}", collection, id)))?;
        apply_updates(&mut doc, updates);
        self.store(collection, id, &doc)
    }

    /// Removes every document of a collection along with its index.
    pub fn clear_collection(&self, collection: &str) -> Result<()> {
        let _guard = self.writes.lock().map_err(|_| ClientError::io("lock poisoned"))?;
        for id in self.ids(collection)? {
            self.kv.delete(&document_key(collection, &id))?;
        }
        self.kv.delete(&collection_list_key(collection))?;
        Ok(())
    }
}

#[async_trait]
impl<S: KeyValue + Send + Sync> DocumentStore for KvDocumentStore<S> {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.load(collection, id)
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        let mut docs = Vec::new();
        for id in self.ids(collection)? {
            if let Some(doc) = self.load(collection, &id)? {
                if matches_all(filters, &doc) {
                    docs.push(doc);
                }
            }
        }
        Ok(docs)
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        let _guard = self.writes.lock().map_err(|_| ClientError::io("lock poisoned"))?;
        self.store(collection, id, &doc)?;

        let mut ids = self.ids(collection)?;
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
            self.kv.set(&collection_list_key(collection), &serde_json::to_vec(&ids)?)?;
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<()> {
        let _guard = self.writes.lock().map_err(|_| ClientError::io("lock poisoned"))?;
        self.modify(collection, id, &updates)
    }

    async fn batch_update(&self, collection: &str, updates: Vec<(String, Vec<FieldUpdate>)>) -> Result<()> {
        let _guard = self.writes.lock().map_err(|_| ClientError::io("lock poisoned"))?;
        for (id, fields) in &updates {
            self.modify(collection, id, fields)?;
        }
        Ok(())
    }
}
