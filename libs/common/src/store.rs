//! Document store abstraction
//!
//! The Souq core treats persistent storage as an external collaborator:
//! services talk to `Collection`/`DocumentStore` traits and never to a
//! concrete backend. The traits assume atomic single-document writes and
//! nothing more — no multi-document transactions.
//!
//! `MemoryStore` is the bundled engine used by the dev server and the
//! test suites. Documents are plain JSON objects; the engine assigns
//! ids, stamps `created_at`/`updated_at` and bumps an internal revision
//! field `_rev` on every update.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A stored document: a flat JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Field of the internal revision counter, excluded from default
/// projections.
pub const REVISION_FIELD: &str = "_rev";

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive substring match (keyword search).
    Contains,
}

/// A single field predicate.
#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: Cmp,
    pub value: Value,
}

/// A filter predicate: every `all` condition must hold, and — when the
/// `any` group is non-empty — at least one of its conditions as well.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub all: Vec<Condition>,
    pub any: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.cond(field, Cmp::Eq, value)
    }

    /// Add a condition with an explicit operator.
    pub fn cond(mut self, field: impl Into<String>, op: Cmp, value: impl Into<Value>) -> Self {
        self.all.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Add a condition to the OR group.
    pub fn or(mut self, field: impl Into<String>, op: Cmp, value: impl Into<Value>) -> Self {
        self.any.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Merge another filter into this one (conjunction of both).
    pub fn and_filter(mut self, other: Filter) -> Self {
        self.all.extend(other.all);
        self.any.extend(other.any);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    /// Evaluate the predicate against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        let all_hold = self.all.iter().all(|c| c.matches(doc));
        let any_holds = self.any.is_empty() || self.any.iter().any(|c| c.matches(doc));
        all_hold && any_holds
    }
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        let actual = doc.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            Cmp::Eq => {
                actual == &self.value
                    || compare_values(actual, &self.value) == Some(Ordering::Equal)
            }
            Cmp::Gt => compare_values(actual, &self.value) == Some(Ordering::Greater),
            Cmp::Gte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            Cmp::Lt => compare_values(actual, &self.value) == Some(Ordering::Less),
            Cmp::Lte => matches!(
                compare_values(actual, &self.value),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            Cmp::Contains => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => {
                    haystack.to_lowercase().contains(&needle.to_lowercase())
                }
                _ => false,
            },
        }
    }
}

/// One key of a multi-key sort.
#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Field projection applied to returned documents.
#[derive(Debug, Clone, Default)]
pub enum Projection {
    /// Every attribute except the internal revision field.
    #[default]
    Default,
    /// Exactly the named attributes (plus `id`).
    Include(Vec<String>),
}

impl Projection {
    fn apply(&self, doc: &Document) -> Document {
        match self {
            Projection::Default => {
                let mut out = doc.clone();
                out.remove(REVISION_FIELD);
                out
            }
            Projection::Include(fields) => {
                let mut out = Document::new();
                if let Some(id) = doc.get("id") {
                    out.insert("id".into(), id.clone());
                }
                for field in fields {
                    if let Some(value) = doc.get(field) {
                        out.insert(field.clone(), value.clone());
                    }
                }
                out
            }
        }
    }
}

/// Compare two JSON values, coercing numeric strings so that query
/// parameters like `"10"` compare against stored numbers.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Total order over JSON values used by sorting: incomparable values
/// fall back to a fixed type rank, null/missing sorts first.
fn order_values(a: &Value, b: &Value) -> Ordering {
    compare_values(a, b).unwrap_or_else(|| type_rank(a).cmp(&type_rank(b)))
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// A named collection of documents.
#[async_trait]
pub trait Collection: Send + Sync {
    /// Fetch matching documents with projection, multi-key sort and
    /// skip/limit pagination. `limit == 0` means unbounded.
    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        sort: &[SortKey],
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Document>>;

    /// Fetch the first matching document, if any.
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>>;

    /// Count matching documents.
    async fn count(&self, filter: &Filter) -> StoreResult<u64>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Document>>;

    /// Insert a document; the store assigns `id` (unless present) and
    /// stamps timestamps. Returns the stored document.
    async fn insert(&self, doc: Document) -> StoreResult<Document>;

    /// Merge `patch` into the document (null values overwrite, they do
    /// not delete). Returns the updated document, or `None` if absent.
    async fn update_by_id(&self, id: Uuid, patch: Document) -> StoreResult<Option<Document>>;

    /// Delete a document, returning it if it existed.
    async fn delete_by_id(&self, id: Uuid) -> StoreResult<Option<Document>>;

    /// Apply numeric increments to every document matching each filter.
    /// Returns the number of documents touched.
    async fn bulk_increment(
        &self,
        ops: &[(Filter, Vec<(String, f64)>)],
    ) -> StoreResult<u64>;
}

/// Handle to a document store: a factory of named collections.
pub trait DocumentStore: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn Collection>;
}

/// In-memory document store.
pub struct MemoryStore {
    collections: std::sync::RwLock<HashMap<String, Arc<MemoryCollection>>>,
    unique_fields: HashMap<String, Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: std::sync::RwLock::new(HashMap::new()),
            unique_fields: HashMap::new(),
        }
    }

    /// Declare a unique field for a collection; inserts and updates that
    /// would duplicate it fail with `StoreError::Conflict`.
    pub fn with_unique(mut self, collection: &str, field: &str) -> Self {
        self.unique_fields
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        if let Some(existing) = self.collections.read().expect("store lock").get(name) {
            return existing.clone();
        }
        let mut guard = self.collections.write().expect("store lock");
        guard
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(MemoryCollection::new(
                    self.unique_fields.get(name).cloned().unwrap_or_default(),
                ))
            })
            .clone()
    }
}

/// One in-memory collection. All writes go through a single `RwLock`,
/// which gives the per-document atomicity the core relies on.
pub struct MemoryCollection {
    docs: RwLock<HashMap<Uuid, Document>>,
    unique_fields: Vec<String>,
}

impl MemoryCollection {
    pub fn new(unique_fields: Vec<String>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            unique_fields,
        }
    }

    fn check_unique(
        &self,
        docs: &HashMap<Uuid, Document>,
        candidate: &Document,
        skip_id: Option<Uuid>,
    ) -> StoreResult<()> {
        for field in &self.unique_fields {
            let Some(value) = candidate.get(field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            for (id, doc) in docs {
                if Some(*id) == skip_id {
                    continue;
                }
                if doc.get(field) == Some(value) {
                    tracing::debug!("unique violation on `{field}`");
                    return Err(StoreError::Conflict(field.clone()));
                }
            }
        }
        Ok(())
    }
}

fn now_value() -> Value {
    serde_json::to_value(Utc::now()).unwrap_or(Value::Null)
}

fn doc_id(doc: &Document) -> Option<Uuid> {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
}

fn sort_documents(docs: &mut [Document], sort: &[SortKey]) {
    docs.sort_by(|a, b| {
        for key in sort {
            let left = a.get(&key.field).unwrap_or(&Value::Null);
            let right = b.get(&key.field).unwrap_or(&Value::Null);
            let ord = order_values(left, right);
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[async_trait]
impl Collection for MemoryCollection {
    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        sort: &[SortKey],
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Document>> {
        let docs = self.docs.read().await;
        let mut matched: Vec<Document> = docs
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect();
        sort_documents(&mut matched, sort);

        let iter = matched.into_iter().skip(skip as usize);
        let selected: Vec<Document> = if limit > 0 {
            iter.take(limit as usize).collect()
        } else {
            iter.collect()
        };

        Ok(selected.iter().map(|doc| projection.apply(doc)).collect())
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(docs.values().find(|doc| filter.matches(doc)).cloned())
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        let docs = self.docs.read().await;
        Ok(docs.values().filter(|doc| filter.matches(doc)).count() as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        let docs = self.docs.read().await;
        Ok(docs.get(&id).cloned())
    }

    async fn insert(&self, mut doc: Document) -> StoreResult<Document> {
        let mut docs = self.docs.write().await;
        self.check_unique(&docs, &doc, None)?;

        let id = doc_id(&doc).unwrap_or_else(Uuid::new_v4);
        doc.insert("id".into(), Value::String(id.to_string()));
        let now = now_value();
        doc.entry("created_at").or_insert_with(|| now.clone());
        doc.insert("updated_at".into(), now);
        doc.insert(REVISION_FIELD.into(), Value::from(1));

        docs.insert(id, doc.clone());
        Ok(doc)
    }

    async fn update_by_id(&self, id: Uuid, patch: Document) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().await;
        if !docs.contains_key(&id) {
            return Ok(None);
        }

        let mut updated = docs.get(&id).cloned().unwrap_or_default();
        for (field, value) in patch {
            if field == "id" || field == REVISION_FIELD {
                continue;
            }
            updated.insert(field, value);
        }
        self.check_unique(&docs, &updated, Some(id))?;

        let rev = updated
            .get(REVISION_FIELD)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        updated.insert(REVISION_FIELD.into(), Value::from(rev + 1));
        updated.insert("updated_at".into(), now_value());

        docs.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        let mut docs = self.docs.write().await;
        Ok(docs.remove(&id))
    }

    async fn bulk_increment(
        &self,
        ops: &[(Filter, Vec<(String, f64)>)],
    ) -> StoreResult<u64> {
        let mut docs = self.docs.write().await;
        let mut touched = 0u64;

        for (filter, deltas) in ops {
            for doc in docs.values_mut() {
                if !filter.matches(doc) {
                    continue;
                }
                for (field, delta) in deltas {
                    let current = doc.get(field).and_then(as_number).unwrap_or(0.0);
                    let next = current + delta;
                    let value = if next.fract() == 0.0 {
                        Value::from(next as i64)
                    } else {
                        serde_json::Number::from_f64(next)
                            .map(Value::Number)
                            .ok_or_else(|| {
                                StoreError::Backend(format!("non-finite increment on `{field}`"))
                            })?
                    };
                    doc.insert(field.clone(), value);
                }
                let rev = doc.get(REVISION_FIELD).and_then(Value::as_u64).unwrap_or(0);
                doc.insert(REVISION_FIELD.into(), Value::from(rev + 1));
                doc.insert("updated_at".into(), now_value());
                touched += 1;
            }
        }

        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: Value) -> Document {
        pairs.as_object().cloned().expect("object literal")
    }

    #[tokio::test]
    async fn insert_assigns_id_and_revision() {
        let coll = MemoryCollection::new(vec![]);
        let stored = coll.insert(doc(json!({ "name": "books" }))).await.unwrap();

        assert!(doc_id(&stored).is_some());
        assert_eq!(stored.get(REVISION_FIELD), Some(&Value::from(1)));
        assert!(stored.contains_key("created_at"));
    }

    #[tokio::test]
    async fn unique_field_rejects_duplicates() {
        let coll = MemoryCollection::new(vec!["email".into()]);
        coll.insert(doc(json!({ "email": "a@souq.io" }))).await.unwrap();

        let err = coll
            .insert(doc(json!({ "email": "a@souq.io" })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(field) if field == "email"));
    }

    #[tokio::test]
    async fn gte_filter_matches_boundary_and_above() {
        let coll = MemoryCollection::new(vec![]);
        for price in [5, 10, 15] {
            coll.insert(doc(json!({ "price": price }))).await.unwrap();
        }

        let filter = Filter::new().cond("price", Cmp::Gte, json!("10"));
        assert_eq!(coll.count(&filter).await.unwrap(), 2);

        let below = Filter::new().cond("price", Cmp::Lt, 10);
        assert_eq!(coll.count(&below).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn multi_key_sort_breaks_ties() {
        let coll = MemoryCollection::new(vec![]);
        for (price, title) in [(20, "zeta"), (30, "beta"), (30, "alpha")] {
            coll.insert(doc(json!({ "price": price, "title": title })))
                .await
                .unwrap();
        }

        let sort = vec![
            SortKey { field: "price".into(), descending: true },
            SortKey { field: "title".into(), descending: false },
        ];
        let found = coll
            .find(&Filter::new(), &Projection::Default, &sort, 0, 0)
            .await
            .unwrap();
        let titles: Vec<&str> = found
            .iter()
            .map(|d| d.get("title").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(titles, vec!["alpha", "beta", "zeta"]);
    }

    #[tokio::test]
    async fn projection_include_keeps_id() {
        let coll = MemoryCollection::new(vec![]);
        coll.insert(doc(json!({ "title": "tea", "price": 4, "sold": 7 })))
            .await
            .unwrap();

        let projection = Projection::Include(vec!["title".into()]);
        let found = coll
            .find(&Filter::new(), &projection, &[], 0, 0)
            .await
            .unwrap();
        let only = &found[0];
        assert!(only.contains_key("id"));
        assert!(only.contains_key("title"));
        assert!(!only.contains_key("price"));
    }

    #[tokio::test]
    async fn default_projection_hides_revision_field() {
        let coll = MemoryCollection::new(vec![]);
        coll.insert(doc(json!({ "name": "brands" }))).await.unwrap();

        let found = coll
            .find(&Filter::new(), &Projection::Default, &[], 0, 0)
            .await
            .unwrap();
        assert!(!found[0].contains_key(REVISION_FIELD));
    }

    #[tokio::test]
    async fn keyword_or_group_matches_either_field() {
        let coll = MemoryCollection::new(vec![]);
        coll.insert(doc(json!({ "title": "Green Tea", "description": "loose leaf" })))
            .await
            .unwrap();
        coll.insert(doc(json!({ "title": "Coffee", "description": "premium TEA blend" })))
            .await
            .unwrap();
        coll.insert(doc(json!({ "title": "Sugar", "description": "white" })))
            .await
            .unwrap();

        let filter = Filter::new()
            .or("title", Cmp::Contains, "tea")
            .or("description", Cmp::Contains, "tea");
        assert_eq!(coll.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn bulk_increment_adjusts_matching_documents() {
        let coll = MemoryCollection::new(vec![]);
        let stored = coll
            .insert(doc(json!({ "quantity": 10, "sold": 2 })))
            .await
            .unwrap();
        let id = doc_id(&stored).unwrap();

        let ops = vec![(
            Filter::new().eq("id", id.to_string()),
            vec![("quantity".to_string(), -3.0), ("sold".to_string(), 3.0)],
        )];
        let touched = coll.bulk_increment(&ops).await.unwrap();
        assert_eq!(touched, 1);

        let after = coll.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(after.get("quantity"), Some(&Value::from(7)));
        assert_eq!(after.get("sold"), Some(&Value::from(5)));
    }

    #[tokio::test]
    async fn update_merges_patch_and_bumps_revision() {
        let coll = MemoryCollection::new(vec![]);
        let stored = coll
            .insert(doc(json!({ "name": "Nike", "slug": "nike" })))
            .await
            .unwrap();
        let id = doc_id(&stored).unwrap();

        let updated = coll
            .update_by_id(id, doc(json!({ "name": "Adidas" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("name"), Some(&Value::from("Adidas")));
        assert_eq!(updated.get("slug"), Some(&Value::from("nike")));
        assert_eq!(updated.get(REVISION_FIELD), Some(&Value::from(2)));
    }
}
