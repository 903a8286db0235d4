//! Generic resource CRUD façade
//!
//! One service handles every catalog-style resource; listing runs the
//! query feature pipeline (filter, search, projection, sort,
//! pagination) and counts with the same merged filter the fetch uses,
//! so the pagination summary reflects the filtered population.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use common::query::{PaginationSummary, QueryFeatures, SearchTarget};
use common::store::{Collection, Document, DocumentStore, Filter};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Descriptor tying a resource to its collection, search target and
/// pre-persist normalization.
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: &'static str;
    const SEARCH: SearchTarget;

    /// Normalize a document before it is persisted (slug generation
    /// and the like). Invoked on create and update.
    fn normalize(_doc: &mut Document) {}
}

/// A page of documents plus its pagination summary.
#[derive(Debug, Serialize)]
pub struct ListResult {
    pub results: usize,
    pub pagination_result: PaginationSummary,
    pub data: Vec<Document>,
}

/// CRUD operations for one resource type.
pub struct CrudService<R: Resource> {
    collection: Arc<dyn Collection>,
    _resource: PhantomData<R>,
}

impl<R: Resource> Clone for CrudService<R> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> CrudService<R> {
    pub fn new(store: &dyn DocumentStore) -> Self {
        Self {
            collection: store.collection(R::COLLECTION),
            _resource: PhantomData,
        }
    }

    /// List documents: query features over the raw parameters, merged
    /// with a base filter supplied by the route (e.g. logged-user order
    /// scoping).
    pub async fn list(
        &self,
        params: HashMap<String, String>,
        base_filter: Filter,
    ) -> ApiResult<ListResult> {
        let features = QueryFeatures::new(params).filter().search(R::SEARCH);
        let filter = base_filter.and_filter(features.filter.clone());

        let total = self.collection.count(&filter).await?;
        let features = features.limit_fields().sort().paginate(total);

        let data = self
            .collection
            .find(
                &filter,
                &features.projection,
                &features.sort,
                features.skip,
                features.limit,
            )
            .await?;

        let pagination_result = features
            .pagination
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("pagination stage skipped")))?;

        Ok(ListResult {
            results: data.len(),
            pagination_result,
            data,
        })
    }

    pub async fn get_one(&self, id: Uuid) -> ApiResult<Document> {
        self.collection
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no document for this id {id}")))
    }

    pub async fn create_one(&self, mut doc: Document) -> ApiResult<Document> {
        R::normalize(&mut doc);
        let stored = self.collection.insert(doc).await?;
        info!("created {} document", R::COLLECTION);
        Ok(stored)
    }

    pub async fn update_one(&self, id: Uuid, mut patch: Document) -> ApiResult<Document> {
        R::normalize(&mut patch);
        self.collection
            .update_by_id(id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no document for this id {id}")))
    }

    pub async fn delete_one(&self, id: Uuid) -> ApiResult<()> {
        self.collection
            .delete_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no document for this id {id}")))?;
        info!("deleted {} document {id}", R::COLLECTION);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::MemoryStore;
    use serde_json::{json, Value};

    use crate::models::ProductResource;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn create_normalizes_and_list_paginates() {
        let store = MemoryStore::new();
        let products = CrudService::<ProductResource>::new(&store);

        for i in 1..=7 {
            products
                .create_one(doc(json!({
                    "title": format!("Product {i}"),
                    "price": i * 10,
                    "quantity": 5,
                    "description": "stocked",
                })))
                .await
                .unwrap();
        }

        let page = products
            .list(params(&[("page", "2"), ("limit", "5")]), Filter::new())
            .await
            .unwrap();
        assert_eq!(page.results, 2);
        assert_eq!(page.pagination_result.number_of_pages, 2);
        assert_eq!(page.pagination_result.prev, Some(1));
        assert_eq!(page.pagination_result.next, None);

        let first = &page.data[0];
        assert!(first.get("slug").and_then(Value::as_str).is_some());
    }

    #[tokio::test]
    async fn list_counts_the_filtered_population() {
        let store = MemoryStore::new();
        let products = CrudService::<ProductResource>::new(&store);

        for price in [10, 20, 30, 40] {
            products
                .create_one(doc(json!({ "title": "t", "description": "d", "price": price })))
                .await
                .unwrap();
        }

        let page = products
            .list(params(&[("price[gte]", "25")]), Filter::new())
            .await
            .unwrap();
        assert_eq!(page.results, 2);
        assert_eq!(page.pagination_result.number_of_pages, 1);
    }

    #[tokio::test]
    async fn get_missing_document_is_not_found() {
        let store = MemoryStore::new();
        let products = CrudService::<ProductResource>::new(&store);

        let err = products.get_one(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_renormalizes_the_slug() {
        let store = MemoryStore::new();
        let products = CrudService::<ProductResource>::new(&store);

        let created = products
            .create_one(doc(json!({ "title": "Old Name", "description": "d" })))
            .await
            .unwrap();
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap();

        let updated = products
            .update_one(id, doc(json!({ "title": "New Name" })))
            .await
            .unwrap();
        assert_eq!(updated.get("slug"), Some(&json!("new-name")));
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = MemoryStore::new();
        let products = CrudService::<ProductResource>::new(&store);

        let created = products
            .create_one(doc(json!({ "title": "Ephemeral", "description": "d" })))
            .await
            .unwrap();
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap();

        products.delete_one(id).await.unwrap();
        assert!(matches!(
            products.get_one(id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            products.delete_one(id).await.unwrap_err(),
            ApiError::NotFound(_)
        ));
    }
}
