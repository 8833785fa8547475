use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::{self, Pipeline, Stage};

/// A document is a flat JSON object keyed by field name.
pub type Document = Map<String, Value>;

pub const CUSTOMERS: &str = "customers";
pub const PRODUCTS: &str = "products";
pub const ENTRIES: &str = "entries";
pub const TRANSACTIONS: &str = "transactions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("document not found: {0}")]
    DocumentNotFound(String),
    #[error("store unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cmp {
    Eq,
    Gte,
    Lte,
    Lt,
}

/// Conjunction of field comparisons matched against documents.
///
/// Numbers compare as f64, strings lexicographically. Lexicographic string
/// comparison is the documented semantics for date fields, which are stored
/// as `YYYY-MM-DD` strings and never parsed.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Cmp, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: Value) -> Self {
        self.clauses.push((field.to_string(), Cmp::Eq, value));
        self
    }

    pub fn gte(mut self, field: &str, value: Value) -> Self {
        self.clauses.push((field.to_string(), Cmp::Gte, value));
        self
    }

    pub fn lte(mut self, field: &str, value: Value) -> Self {
        self.clauses.push((field.to_string(), Cmp::Lte, value));
        self
    }

    pub fn lt(mut self, field: &str, value: Value) -> Self {
        self.clauses.push((field.to_string(), Cmp::Lt, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|(field, cmp, expected)| {
            let Some(actual) = doc.get(field) else {
                return false;
            };
            match compare_values(actual, expected) {
                Some(ord) => match cmp {
                    Cmp::Eq => ord == Ordering::Equal,
                    Cmp::Gte => ord != Ordering::Less,
                    Cmp::Lte => ord != Ordering::Greater,
                    Cmp::Lt => ord == Ordering::Less,
                },
                None => false,
            }
        })
    }
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            na.as_f64().unwrap_or(0.0).partial_cmp(&nb.as_f64().unwrap_or(0.0))
        }
        (Value::String(sa), Value::String(sb)) => Some(sa.cmp(sb)),
        (Value::Bool(ba), Value::Bool(bb)) => Some(ba.cmp(bb)),
        _ => None,
    }
}

pub trait DocumentStore: Send + Sync {
    fn ping(&self) -> bool;
    fn insert(&self, collection: &str, doc: Document) -> Result<String, StoreError>;
    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;
    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
    fn update(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError>;
    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError>;
}

pub struct InMemoryStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Document>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let mut collections = BTreeMap::new();
        for name in [CUSTOMERS, PRODUCTS, ENTRIES, TRANSACTIONS] {
            collections.insert(name.to_string(), BTreeMap::new());
        }
        Self {
            collections: RwLock::new(collections),
        }
    }
}

impl DocumentStore for InMemoryStore {
    fn ping(&self) -> bool {
        true
    }

    fn insert(&self, collection: &str, mut doc: Document) -> Result<String, StoreError> {
        let mut collections = self.collections.write().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let id = Uuid::new_v4().to_string();
        doc.insert("_id".to_string(), Value::String(id.clone()));
        coll.insert(id.clone(), doc);
        tracing::debug!(collection, id = %id, "document inserted");
        Ok(id)
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().unwrap();
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        Ok(coll.values().filter(|d| filter.matches(d)).cloned().collect())
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().unwrap();
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        if filter.is_empty() {
            return Ok(coll.len() as u64);
        }
        Ok(coll.values().filter(|d| filter.matches(d)).count() as u64)
    }

    fn update(&self, collection: &str, id: &str, mut doc: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let slot = coll
            .get_mut(id)
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        doc.insert("_id".to_string(), Value::String(id.to_string()));
        *slot = doc;
        tracing::debug!(collection, id, "document replaced");
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        coll.remove(id)
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))?;
        tracing::debug!(collection, id, "document deleted");
        Ok(())
    }

    fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().unwrap();
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;
        let mut docs: Vec<Document> = coll.values().cloned().collect();

        for stage in pipeline.stages() {
            docs = match stage {
                // $lookup needs access to sibling collections, so it is
                // resolved here rather than inside the stage evaluator.
                Stage::Lookup(spec) => {
                    let foreign = collections
                        .get(&spec.from)
                        .ok_or_else(|| StoreError::CollectionNotFound(spec.from.clone()))?;
                    let foreign_docs: Vec<Document> = foreign.values().cloned().collect();
                    pipeline::lookup(docs, spec, &foreign_docs)
                }
                other => pipeline::apply(other, docs),
            };
        }

        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn insert_assigns_id_and_find_returns_it() {
        let store = InMemoryStore::new();
        let id = store
            .insert(CUSTOMERS, doc(json!({"name": "Jane"})))
            .unwrap();
        assert!(!id.is_empty());

        let docs = store.find(CUSTOMERS, &Filter::new()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("_id"), Some(&Value::String(id)));
    }

    #[test]
    fn filter_compares_dates_lexicographically() {
        let store = InMemoryStore::new();
        store
            .insert(ENTRIES, doc(json!({"date": "2023-01-15"})))
            .unwrap();
        store
            .insert(ENTRIES, doc(json!({"date": "2023-06-01"})))
            .unwrap();

        let filter = Filter::new()
            .gte("date", json!("2023-02-01"))
            .lte("date", json!("2023-12-31"));
        assert_eq!(store.count(ENTRIES, &filter).unwrap(), 1);
    }

    #[test]
    fn filter_rejects_missing_fields() {
        let store = InMemoryStore::new();
        store.insert(ENTRIES, doc(json!({"notes": "x"}))).unwrap();

        let filter = Filter::new().eq("is_credit", json!(true));
        assert_eq!(store.count(ENTRIES, &filter).unwrap(), 0);
    }

    #[test]
    fn unknown_collection_is_an_error() {
        let store = InMemoryStore::new();
        assert!(store.find("invoices", &Filter::new()).is_err());
    }

    #[test]
    fn update_replaces_document_but_keeps_id() {
        let store = InMemoryStore::new();
        let id = store
            .insert(CUSTOMERS, doc(json!({"name": "Jane", "contact": "1"})))
            .unwrap();
        store
            .update(CUSTOMERS, &id, doc(json!({"name": "Janet"})))
            .unwrap();

        let docs = store.find(CUSTOMERS, &Filter::new()).unwrap();
        assert_eq!(docs[0].get("name"), Some(&json!("Janet")));
        assert_eq!(docs[0].get("contact"), None);
        assert_eq!(docs[0].get("_id"), Some(&Value::String(id)));
    }
}
