//! In-process backends.
//!
//! Not a production store: no persistence and no cross-process sharing.
//! The document store records every operation it serves and can be told
//! to fail a collection, which is what the integration tests lean on.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::backend::{
    apply_updates, matches_all, AppBackends, BlobStore, DocumentStore, FieldUpdate, Filter, IdentityProvider,
};
use crate::core::errors::{ClientError, Result};
use crate::core::helpers::{hash_password, verify_password};
use crate::models::Document;

fn poisoned<T>(_: PoisonError<T>) -> ClientError {
    ClientError::io("lock poisoned")
}

/// Record of a document store call, for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Get { collection: String, id: String },
    Query { collection: String, filters: Vec<Filter> },
    Set { collection: String, id: String },
    Update { collection: String, id: String, updates: Vec<FieldUpdate> },
    BatchUpdate { collection: String, ids: Vec<String> },
}

#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, BTreeMap<String, Document>>>,
    operations: Mutex<Vec<StoreOp>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call on `collection` fails with an I/O error until [`Self::heal`].
    pub fn fail_collection(&self, collection: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(collection.to_string());
        }
    }

    pub fn heal(&self) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.clear();
        }
    }

    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().map(|ops| ops.clone()).unwrap_or_default()
    }

    pub fn clear_operations(&self) {
        if let Ok(mut ops) = self.operations.lock() {
            ops.clear();
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .map(|c| c.get(collection).map(BTreeMap::len).unwrap_or(0))
            .unwrap_or(0)
    }

    /// Drops every document and operation record.
    pub fn clear(&self) {
        if let Ok(mut collections) = self.collections.lock() {
            collections.clear();
        }
        self.clear_operations();
    }

    fn record(&self, op: StoreOp) -> Result<()> {
        let collection = match &op {
            StoreOp::Get { collection, .. }
            | StoreOp::Query { collection, .. }
            | StoreOp::Set { collection, .. }
            | StoreOp::Update { collection, .. }
            | StoreOp::BatchUpdate { collection, .. } => collection.clone(),
        };
        self.operations.lock().map_err(poisoned)?.push(op);
        if self.failing.lock().map_err(poisoned)?.contains(&collection) {
            return Err(ClientError::io(format!("collection {} unavailable", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.record(StoreOp::Get { collection: collection.to_string(), id: id.to_string() })?;
        let collections = self.collections.lock().map_err(poisoned)?;
        Ok(collections.get(collection).and_then(|docs| docs.get(id)).cloned())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>> {
        self.record(StoreOp::Query { collection: collection.to_string(), filters: filters.to_vec() })?;
        let collections = self.collections.lock().map_err(poisoned)?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().filter(|doc| matches_all(filters, doc)).cloned().collect())
            .unwrap_or_default())
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()> {
        self.record(StoreOp::Set { collection: collection.to_string(), id: id.to_string() })?;
        let mut collections = self.collections.lock().map_err(poisoned)?;
        collections.entry(collection.to_string()).or_default().insert(id.to_string(), doc);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<()> {
        self.record(StoreOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            updates: updates.clone(),
        })?;
        let mut collections = self.collections.lock().map_err(poisoned)?;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| ClientError::io(format!("no document {}/{}", collection, id)))?;
        apply_updates(doc, &updates);
        Ok(())
    }

    async fn batch_update(&self, collection: &str, updates: Vec<(String, Vec<FieldUpdate>)>) -> Result<()> {
        self.record(StoreOp::BatchUpdate {
            collection: collection.to_string(),
            ids: updates.iter().map(|(id, _)| id.clone()).collect(),
        })?;
        let mut collections = self.collections.lock().map_err(poisoned)?;
        let docs = collections.entry(collection.to_string()).or_default();

        // All or nothing
        if let Some((missing, _)) = updates.iter().find(|(id, _)| !docs.contains_key(id)) {
            return Err(ClientError::io(format!("no document {}/{}", collection, missing)));
        }
        for (id, fields) in &updates {
            if let Some(doc) = docs.get_mut(id) {
                apply_updates(doc, fields);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Account {
    user_id: String,
    password_hash: String,
}

/// Email/password accounts with a single signed-in user.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<String>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().map(|a| a.len()).unwrap_or(0)
    }

    /// Drops the signed-in user without going through `sign_out`.
    pub fn expire_session(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }

    pub fn clear(&self) {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.clear();
        }
        self.expire_session();
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::Auth("email and password are required".to_string()));
        }
        let password_hash = hash_password(password).map_err(|e| ClientError::Auth(e.to_string()))?;

        let mut accounts = self.accounts.lock().map_err(poisoned)?;
        if accounts.contains_key(email) {
            return Err(ClientError::Auth("email address is already in use".to_string()));
        }
        let user_id = Uuid::new_v4().to_string();
        accounts.insert(email.to_string(), Account { user_id: user_id.clone(), password_hash });
        drop(accounts);

        *self.current.lock().map_err(poisoned)? = Some(user_id.clone());
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String> {
        let account = self.accounts.lock().map_err(poisoned)?.get(email).cloned();
        match account {
            Some(account) if verify_password(password, &account.password_hash) => {
                *self.current.lock().map_err(poisoned)? = Some(account.user_id.clone());
                Ok(account.user_id)
            }
            _ => Err(ClientError::Auth("invalid email or password".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        *self.current.lock().map_err(poisoned)? = None;
        Ok(())
    }

    async fn current_user_id(&self) -> Option<String> {
        self.current.lock().ok().and_then(|c| c.clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok().and_then(|b| b.get(url).cloned())
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.clear();
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, bytes: Vec<u8>) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::io("upload rejected"));
        }
        let url = format!("mem://images/{}", Uuid::new_v4());
        self.blobs.lock().map_err(poisoned)?.insert(url.clone(), bytes);
        Ok(url)
    }
}

/// The three memory backends plus the trait-object bundle a session needs.
#[derive(Clone, Default)]
pub struct MemoryBackends {
    pub identity: Arc<MemoryIdentityProvider>,
    pub documents: Arc<MemoryDocumentStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

impl MemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backends(&self) -> AppBackends {
        AppBackends::new(
            self.identity.clone(),
            self.documents.clone(),
            self.blobs.clone(),
        )
    }

    /// Forgets every account, document and blob.
    pub fn reset(&self) {
        self.identity.clear();
        self.documents.clear();
        self.blobs.clear();
    }
}
