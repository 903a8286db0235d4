//! Integration tests running the query feature pipeline against the
//! in-memory document store, the same way the CRUD façade does: build
//! filter + search first, count with that filter, then project, sort
//! and paginate the fetch.

use std::collections::HashMap;

use common::query::{QueryFeatures, SearchTarget};
use common::store::{Collection, Filter, MemoryCollection};
use serde_json::{json, Value};

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn seed_products(coll: &MemoryCollection, count: i64) {
    for i in 1..=count {
        let doc = json!({
            "title": format!("product-{i:02}"),
            "description": "everyday item",
            "price": i * 10,
            "quantity": 100,
        });
        coll.insert(doc.as_object().cloned().unwrap()).await.unwrap();
    }
}

async fn run_list(
    coll: &MemoryCollection,
    raw: HashMap<String, String>,
    target: SearchTarget,
) -> (Vec<common::store::Document>, common::query::PaginationSummary) {
    let features = QueryFeatures::new(raw).filter().search(target);
    let filter = features.filter.clone();
    let total = coll.count(&filter).await.unwrap();
    let features = features.limit_fields().sort().paginate(total);

    let docs = coll
        .find(
            &filter,
            &features.projection,
            &features.sort,
            features.skip,
            features.limit,
        )
        .await
        .unwrap();
    (docs, features.pagination.unwrap())
}

fn prices(docs: &[common::store::Document]) -> Vec<i64> {
    docs.iter()
        .map(|d| d.get("price").and_then(Value::as_i64).unwrap())
        .collect()
}

#[tokio::test]
async fn second_page_sorted_by_price_descending_returns_ranks_six_to_ten() {
    let coll = MemoryCollection::new(vec![]);
    seed_products(&coll, 12).await;

    let (docs, summary) = run_list(
        &coll,
        params(&[("page", "2"), ("limit", "5"), ("sort", "-price")]),
        SearchTarget::TitleDescription,
    )
    .await;

    // 12 products priced 10..=120; ranks 6-10 by descending price.
    assert_eq!(prices(&docs), vec![70, 60, 50, 40, 30]);
    assert_eq!(summary.current_page, 2);
    assert_eq!(summary.number_of_pages, 3);
    assert_eq!(summary.next, Some(3));
    assert_eq!(summary.prev, Some(1));
}

#[tokio::test]
async fn price_gte_filter_round_trips_through_the_store() {
    let coll = MemoryCollection::new(vec![]);
    seed_products(&coll, 6).await;

    let (docs, summary) = run_list(
        &coll,
        params(&[("price[gte]", "40"), ("limit", "10")]),
        SearchTarget::TitleDescription,
    )
    .await;

    let mut found = prices(&docs);
    found.sort_unstable();
    assert_eq!(found, vec![40, 50, 60]);
    assert_eq!(summary.number_of_pages, 1);
}

#[tokio::test]
async fn keyword_search_filters_the_counted_population() {
    let coll = MemoryCollection::new(vec![]);
    for (title, description) in [
        ("Green Tea", "loose leaf"),
        ("Black Tea", "strong"),
        ("Coffee", "arabica"),
    ] {
        let doc = json!({ "title": title, "description": description, "price": 5 });
        coll.insert(doc.as_object().cloned().unwrap()).await.unwrap();
    }

    let (docs, summary) = run_list(
        &coll,
        params(&[("keyword", "tea")]),
        SearchTarget::TitleDescription,
    )
    .await;

    assert_eq!(docs.len(), 2);
    assert_eq!(summary.number_of_pages, 1);
    assert_eq!(summary.next, None);
}

#[tokio::test]
async fn field_projection_applies_to_listed_documents() {
    let coll = MemoryCollection::new(vec![]);
    seed_products(&coll, 3).await;

    let (docs, _) = run_list(
        &coll,
        params(&[("fields", "title,price")]),
        SearchTarget::TitleDescription,
    )
    .await;

    for doc in &docs {
        assert!(doc.contains_key("id"));
        assert!(doc.contains_key("title"));
        assert!(doc.contains_key("price"));
        assert!(!doc.contains_key("description"));
        assert!(!doc.contains_key("quantity"));
    }
}

#[tokio::test]
async fn unknown_operator_suffix_matches_nothing_but_raises_no_error() {
    let coll = MemoryCollection::new(vec![]);
    seed_products(&coll, 4).await;

    // `price[xx]` is treated as a literal field name that no document has.
    let (docs, summary) = run_list(
        &coll,
        params(&[("price[xx]", "10")]),
        SearchTarget::TitleDescription,
    )
    .await;

    assert!(docs.is_empty());
    assert_eq!(summary.number_of_pages, 0);
    assert_eq!(summary.next, None);
    assert_eq!(summary.prev, None);
}

#[tokio::test]
async fn base_filter_scopes_both_count_and_fetch() {
    let coll = MemoryCollection::new(vec![]);
    for owner in ["alice", "alice", "bob"] {
        let doc = json!({ "user": owner, "total_order_price": 30 });
        coll.insert(doc.as_object().cloned().unwrap()).await.unwrap();
    }

    let base = Filter::new().eq("user", "alice");
    let features = QueryFeatures::new(params(&[])).filter().search(SearchTarget::Name);
    let filter = base.and_filter(features.filter.clone());
    let total = coll.count(&filter).await.unwrap();
    let features = features.limit_fields().sort().paginate(total);

    let docs = coll
        .find(&filter, &features.projection, &features.sort, features.skip, features.limit)
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(features.pagination.unwrap().number_of_pages, 1);
}
