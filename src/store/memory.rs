//! In-memory document store with the same semantics as `PgStore`.
//!
//! Useful for testing and local development. Uses an `RwLock` for thread-safe access;
//! each operation holds the lock for its whole duration, so single-document writes are atomic.

use crate::error::AppError;
use crate::query::{compare_values, Direction, Filter, FindOptions, Populate, Sort};
use crate::store::{CollectionSpec, DocumentStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Collection {
    docs: Vec<Map<String, Value>>,
    unique_fields: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> AppError {
    AppError::Internal("memory store lock poisoned".into())
}

/// First unique field on which `candidate` collides with another document (skipping index `skip`).
fn unique_violation(coll: &Collection, candidate: &Map<String, Value>, skip: Option<usize>) -> Option<String> {
    if coll
        .docs
        .iter()
        .enumerate()
        .any(|(i, d)| Some(i) != skip && d.get("id") == candidate.get("id"))
    {
        return Some("id".into());
    }
    coll.unique_fields
        .iter()
        .find(|field| {
            let Some(v) = candidate.get(field.as_str()).filter(|v| !v.is_null()) else {
                return false;
            };
            coll.docs
                .iter()
                .enumerate()
                .any(|(i, d)| Some(i) != skip && d.get(field.as_str()) == Some(v))
        })
        .cloned()
}

fn sort_docs(docs: &mut [Value], sort: &[Sort]) {
    docs.sort_by(|a, b| {
        for s in sort {
            let ord = match (a.get(&s.field).filter(|v| !v.is_null()), b.get(&s.field).filter(|v| !v.is_null())) {
                (Some(x), Some(y)) => {
                    let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                    match s.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                }
                // missing values sort last in both directions
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        let id_a = a.get("id").and_then(Value::as_str).unwrap_or("");
        let id_b = b.get("id").and_then(Value::as_str).unwrap_or("");
        id_a.cmp(id_b)
    });
}

fn populate_doc(collections: &HashMap<String, Collection>, doc: &mut Value, populate: &[Populate]) {
    let Some(obj) = doc.as_object_mut() else { return };
    for p in populate {
        let Some(reference) = obj.get(&p.field).and_then(Value::as_str) else { continue };
        let related = collections.get(&p.collection).and_then(|c| {
            c.docs
                .iter()
                .find(|d| d.get("id").and_then(Value::as_str) == Some(reference))
        });
        if let Some(related) = related {
            obj.insert(p.field.clone(), Value::Object(related.clone()));
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), AppError> {
        let mut collections = self.collections.write().map_err(|_| lock_poisoned())?;
        let coll = collections.entry(spec.name.clone()).or_default();
        for field in &spec.unique_fields {
            if !coll.unique_fields.contains(field) {
                coll.unique_fields.push(field.clone());
            }
        }
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), AppError> {
        if !doc.get("id").map(Value::is_string).unwrap_or(false) {
            return Err(AppError::Internal("document without id".into()));
        }
        let mut collections = self.collections.write().map_err(|_| lock_poisoned())?;
        let coll = collections.entry(collection.to_string()).or_default();
        if let Some(field) = unique_violation(coll, &doc, None) {
            return Err(AppError::Conflict { field });
        }
        coll.docs.push(doc);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Vec<Value>, AppError> {
        let collections = self.collections.read().map_err(|_| lock_poisoned())?;
        let Some(coll) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let mut docs: Vec<Value> = coll
            .docs
            .iter()
            .map(|d| Value::Object(d.clone()))
            .filter(|d| filter.matches(d))
            .collect();
        sort_docs(&mut docs, &opts.sort);
        let limit = opts.limit.map(|n| n as usize).unwrap_or(usize::MAX);
        let mut page: Vec<Value> = docs.into_iter().skip(opts.skip as usize).take(limit).collect();
        for doc in &mut page {
            populate_doc(&collections, doc, &opts.populate);
        }
        Ok(page)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let collections = self.collections.read().map_err(|_| lock_poisoned())?;
        Ok(collections
            .get(collection)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|d| filter.matches(&Value::Object((*d).clone())))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
        unset: &[String],
    ) -> Result<u64, AppError> {
        let mut collections = self.collections.write().map_err(|_| lock_poisoned())?;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(index) = coll
            .docs
            .iter()
            .position(|d| filter.matches(&Value::Object(d.clone())))
        else {
            return Ok(0);
        };
        let mut updated = coll.docs[index].clone();
        for (k, v) in set {
            updated.insert(k, v);
        }
        for k in unset {
            updated.remove(k);
        }
        if let Some(field) = unique_violation(coll, &updated, Some(index)) {
            return Err(AppError::Conflict { field });
        }
        coll.docs[index] = updated;
        Ok(1)
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let mut collections = self.collections.write().map_err(|_| lock_poisoned())?;
        let Some(coll) = collections.get_mut(collection) else {
            return Ok(0);
        };
        match coll
            .docs
            .iter()
            .position(|d| filter.matches(&Value::Object(d.clone())))
        {
            Some(index) => {
                coll.docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
