//! Narrow contracts for the hosted services the session talks to.
//!
//! The session never sees a concrete backend: it holds an [`AppBackends`]
//! bundle of trait objects. [`crate::core::memory`] provides in-process
//! implementations and [`crate::core::kv`] maps documents onto a flat
//! key-value store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::errors::Result;
use crate::models::Document;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an account and signs it in. Returns the new user id.
    async fn create_account(&self, email: &str, password: &str) -> Result<String>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<String>;

    async fn sign_out(&self) -> Result<()>;

    async fn current_user_id(&self) -> Option<String>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Returns every document matching all filters. Order is unspecified.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Document>>;

    /// Creates or fully replaces a document.
    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<()>;

    /// Applies field deltas to an existing document. Missing documents are an error.
    async fn update(&self, collection: &str, id: &str, updates: Vec<FieldUpdate>) -> Result<()>;

    async fn batch_update(
        &self,
        collection: &str,
        updates: Vec<(String, Vec<FieldUpdate>)>,
    ) -> Result<()>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores the bytes and returns a URL they can be fetched from.
    async fn upload(&self, bytes: Vec<u8>) -> Result<String>;
}

/// The three services a session is wired to.
#[derive(Clone)]
pub struct AppBackends {
    pub identity: Arc<dyn IdentityProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppBackends {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        AppBackends { identity, documents, blobs }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Numeric greater-than.
    Gt(String, Value),
    ArrayContains(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Filter::Gt(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: impl Into<Value>) -> Self {
        Filter::ArrayContains(field.to_string(), value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::In(field, values) => doc
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            Filter::Gt(field, value) => match (doc.get(field).and_then(Value::as_f64), value.as_f64()) {
                (Some(have), Some(bound)) => have > bound,
                _ => false,
            },
            Filter::ArrayContains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }
}

pub fn matches_all(filters: &[Filter], doc: &Document) -> bool {
    filters.iter().all(|f| f.matches(doc))
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    Set(Value),
    /// Appends each value not already present.
    ArrayUnion(Vec<Value>),
    ArrayRemove(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub field: String,
    pub delta: FieldDelta,
}

impl FieldUpdate {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate { field: field.to_string(), delta: FieldDelta::Set(value.into()) }
    }

    pub fn array_union(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate { field: field.to_string(), delta: FieldDelta::ArrayUnion(vec![value.into()]) }
    }

    pub fn array_remove(field: &str, value: impl Into<Value>) -> Self {
        FieldUpdate { field: field.to_string(), delta: FieldDelta::ArrayRemove(vec![value.into()]) }
    }
}

/// Applies updates in order. Array deltas on a non-array field replace it.
pub fn apply_updates(doc: &mut Document, updates: &[FieldUpdate]) {
    for update in updates {
        match &update.delta {
            FieldDelta::Set(value) => {
                doc.insert(update.field.clone(), value.clone());
            }
            FieldDelta::ArrayUnion(values) => {
                let mut items = take_array(doc, &update.field);
                for value in values {
                    if !items.contains(value) {
                        items.push(value.clone());
                    }
                }
                doc.insert(update.field.clone(), Value::Array(items));
            }
            FieldDelta::ArrayRemove(values) => {
                let mut items = take_array(doc, &update.field);
                items.retain(|item| !values.contains(item));
                doc.insert(update.field.clone(), Value::Array(items));
            }
        }
    }
}

fn take_array(doc: &mut Document, field: &str) -> Vec<Value> {
    match doc.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
