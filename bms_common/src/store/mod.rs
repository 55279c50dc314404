//! # Document Store
//!
//! A small in-memory document database. Documents are JSON objects grouped into
//! named collections; queries are equality filters with optional sort and limit.
//! The HTTP handlers are the only users, and the notification and imaging
//! modules do not depend on it.
//!
//! Nothing is written to disk: every collection is lost when the process
//! exits. Deployments that need durable data must put a persistent database
//! behind the same operations.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Names of the collections used by the backend.
pub mod collections {
    pub const ARTICLES: &str = "articles";
    pub const POSTITS: &str = "postits";
    pub const AGENDA: &str = "agenda";
    pub const PUBS: &str = "pubs";
    pub const MEMOS: &str = "memos";
    pub const TODOS: &str = "todos";
    pub const ARTICLE_STATS: &str = "article_stats";
}

/// A stored document.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("documents must serialize to a JSON object")]
    NotAnObject,
    #[error("document (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Equality filter. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// Matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches documents whose `field` equals `value`.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    /// Adds another equality condition.
    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.0.iter().all(|(k, v)| doc.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort and limit applied after filtering.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn sorted(field: &str, order: SortOrder) -> Self {
        Self {
            sort: Some((field.to_string(), order)),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Orders numbers numerically and strings lexically. Missing fields sort first.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Converts any serializable value into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

/// Converts a stored document back into a typed value.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// # Memory Store
///
/// Collections live behind one async `RwLock`; every operation is atomic with
/// respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a document to `collection`.
    pub async fn insert<T: Serialize>(&self, collection: &str, value: &T) -> Result<(), StoreError> {
        let doc = to_document(value)?;
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(doc);
        Ok(())
    }

    /// Builds a document from the current contents of `collection` and appends it,
    /// all under one write lock. Use when the new document depends on existing
    /// ones (next id, uniqueness).
    pub async fn insert_with<F>(&self, collection: &str, build: F) -> Result<Document, StoreError>
    where
        F: FnOnce(&[Document]) -> Result<Document, StoreError>,
    {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        let doc = build(docs)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    /// All matching documents, sorted and limited per `options`.
    pub async fn find(&self, collection: &str, filter: &Filter, options: &FindOptions) -> Vec<Document> {
        let guard = self.collections.read().await;
        let mut found: Vec<Document> = guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, order)) = &options.sort {
            found.sort_by(|a, b| {
                let ord = compare_fields(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = options.limit {
            found.truncate(limit);
        }
        found
    }

    /// Typed variant of [`MemoryStore::find`].
    pub async fn find_as<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        self.find(collection, filter, options)
            .await
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// First matching document in insertion order.
    pub async fn find_one(&self, collection: &str, filter: &Filter) -> Option<Document> {
        let guard = self.collections.read().await;
        guard.get(collection)?.iter().find(|d| filter.matches(d)).cloned()
    }

    /// Overwrites the fields in `set` on the first matching document.
    /// Returns whether a document matched.
    pub async fn update_one(&self, collection: &str, filter: &Filter, set: Document) -> bool {
        self.update_with(collection, filter, |doc| doc.extend(set))
            .await
            .is_some()
    }

    /// Applies `change` to the first matching document and returns the result.
    pub async fn update_with<F>(&self, collection: &str, filter: &Filter, change: F) -> Option<Document>
    where
        F: FnOnce(&mut Document),
    {
        let mut guard = self.collections.write().await;
        let doc = guard
            .get_mut(collection)?
            .iter_mut()
            .find(|d| filter.matches(d))?;
        change(doc);
        Some(doc.clone())
    }

    /// Applies `change` to the first matching document, or to a new document
    /// seeded with the filter's fields when none matches. Returns the result.
    pub async fn upsert_with<F>(&self, collection: &str, filter: &Filter, change: F) -> Document
    where
        F: FnOnce(&mut Document),
    {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
            change(doc);
            return doc.clone();
        }
        let mut doc = filter.0.clone();
        change(&mut doc);
        docs.push(doc.clone());
        doc
    }

    /// Removes the first matching document. Returns whether one was removed.
    pub async fn delete_one(&self, collection: &str, filter: &Filter) -> bool {
        let mut guard = self.collections.write().await;
        let Some(docs) = guard.get_mut(collection) else {
            return false;
        };
        match docs.iter().position(|d| filter.matches(d)) {
            Some(index) => {
                docs.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn count(&self, collection: &str, filter: &Filter) -> usize {
        let guard = self.collections.read().await;
        guard
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0)
    }
}
