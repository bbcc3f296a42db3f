use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::async_trait;
use serde_json::Value;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use uuid::Uuid;

use crate::backend::{
    BackendError, Direction, Document, DocumentRef, DocumentStore, FieldUpdate, Fields, Filter,
    FilterOp, Query, ReadTransaction,
};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// Document store held in process memory.
///
/// Writers take the lock exclusively, so a transaction holding the read guard
/// observes one consistent snapshot of every collection.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lookup(collections: &Collections, doc: &DocumentRef) -> Option<Document> {
    collections
        .get(&doc.collection)
        .and_then(|c| c.get(&doc.id))
        .map(|fields| Document {
            id: doc.id.clone(),
            fields: fields.clone(),
        })
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentRef, BackendError> {
        let id = Uuid::now_v7().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(DocumentRef::new(collection, id))
    }

    async fn set(&self, doc: &DocumentRef, fields: Fields, merge: bool) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(doc.collection.clone()).or_default();
        if merge {
            if let Some(existing) = collection.get_mut(&doc.id) {
                existing.extend(fields);
                return Ok(());
            }
        }
        collection.insert(doc.id.clone(), fields);
        Ok(())
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<Document>, BackendError> {
        Ok(lookup(&*self.collections.read().await, doc))
    }

    async fn update(
        &self,
        doc: &DocumentRef,
        field: &str,
        update: FieldUpdate,
    ) -> Result<(), BackendError> {
        let mut collections = self.collections.write().await;
        let fields = collections
            .get_mut(&doc.collection)
            .and_then(|c| c.get_mut(&doc.id))
            .ok_or_else(|| BackendError::NotFound(doc.to_string()))?;

        match update {
            FieldUpdate::Set(value) => {
                fields.insert(field.to_string(), value);
            }
            FieldUpdate::ArrayUnion(values) => {
                let slot = fields.entry(field.to_string()).or_insert(Value::Null);
                if !slot.is_array() {
                    *slot = Value::Array(Vec::new());
                }
                if let Value::Array(items) = slot {
                    for value in values {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                }
            }
            FieldUpdate::ArrayRemove(values) => {
                let slot = fields.entry(field.to_string()).or_insert(Value::Null);
                match slot {
                    Value::Array(items) => items.retain(|item| !values.contains(item)),
                    _ => *slot = Value::Array(Vec::new()),
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<(), BackendError> {
        if let Some(collection) = self.collections.write().await.get_mut(&doc.collection) {
            collection.remove(&doc.id);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, BackendError> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = collection
            .iter()
            .filter(|(_, fields)| query.filters.iter().all(|f| matches(fields, f)))
            .filter(|(_, fields)| {
                query
                    .order_by
                    .iter()
                    .all(|order| fields.contains_key(&order.field))
            })
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();

        // Ties fall back to the document id, in the direction of the last ordering.
        let tie_break = query
            .order_by
            .last()
            .map(|o| o.direction)
            .unwrap_or(Direction::Asc);
        matched.sort_by(|a, b| {
            query
                .order_by
                .iter()
                .map(|order| {
                    let ord = compare_values(
                        a.fields.get(&order.field).unwrap_or(&Value::Null),
                        b.fields.get(&order.field).unwrap_or(&Value::Null),
                    );
                    directed(ord, order.direction)
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or_else(|| directed(a.id.cmp(&b.id), tie_break))
        });

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    async fn read_transaction(&self) -> Result<Box<dyn ReadTransaction>, BackendError> {
        let snapshot = self.collections.clone().read_owned().await;
        Ok(Box::new(MemoryReadTransaction { snapshot }))
    }
}

struct MemoryReadTransaction {
    snapshot: OwnedRwLockReadGuard<Collections>,
}

#[async_trait]
impl ReadTransaction for MemoryReadTransaction {
    async fn get(&mut self, doc: &DocumentRef) -> Result<Option<Document>, BackendError> {
        Ok(lookup(&self.snapshot, doc))
    }
}

fn directed(ord: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ord,
        Direction::Desc => ord.reverse(),
    }
}

/// Range and equality filters only match values of the same type.
fn matches(fields: &Fields, filter: &Filter) -> bool {
    let Some(value) = fields.get(&filter.field) else {
        return false;
    };
    if type_rank(value) != type_rank(&filter.value) {
        return false;
    }
    let ord = compare_values(value, &filter.value);
    match filter.op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Ge => ord != Ordering::Less,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order across value types: null < bool < number < string < array < object.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| compare_values(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => x
            .iter()
            .zip(y.iter())
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| compare_values(va, vb)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
