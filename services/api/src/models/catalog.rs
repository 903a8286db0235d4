//! Catalog resource descriptors
//!
//! The CRUD façade is document-generic; each resource contributes its
//! collection name, keyword-search target and pre-persist
//! normalization (slug generation, where the resource carries one).

use common::query::SearchTarget;
use common::store::Document;
use serde_json::Value;

use crate::crud::Resource;
use crate::models::slugify;

/// Derive the `slug` field from a source field, if present.
fn normalize_slug(doc: &mut Document, source: &str) {
    if let Some(text) = doc.get(source).and_then(Value::as_str) {
        let slug = slugify(text);
        doc.insert("slug".to_string(), Value::String(slug));
    }
}

/// Products: searched by title/description, slugged from the title.
pub struct ProductResource;

impl Resource for ProductResource {
    const COLLECTION: &'static str = "products";
    const SEARCH: SearchTarget = SearchTarget::TitleDescription;

    fn normalize(doc: &mut Document) {
        normalize_slug(doc, "title");
    }
}

/// Categories: searched by name, slugged from the name.
pub struct CategoryResource;

impl Resource for CategoryResource {
    const COLLECTION: &'static str = "categories";
    const SEARCH: SearchTarget = SearchTarget::Name;

    fn normalize(doc: &mut Document) {
        normalize_slug(doc, "name");
    }
}

/// Subcategories: searched by name, slugged from the name; the
/// `category` field points at the parent category.
pub struct SubCategoryResource;

impl Resource for SubCategoryResource {
    const COLLECTION: &'static str = "subcategories";
    const SEARCH: SearchTarget = SearchTarget::Name;

    fn normalize(doc: &mut Document) {
        normalize_slug(doc, "name");
    }
}

/// Brands: searched by name, slugged from the name.
pub struct BrandResource;

impl Resource for BrandResource {
    const COLLECTION: &'static str = "brands";
    const SEARCH: SearchTarget = SearchTarget::Name;

    fn normalize(doc: &mut Document) {
        normalize_slug(doc, "name");
    }
}

/// Reviews: no slug, searched by name like every non-product resource.
pub struct ReviewResource;

impl Resource for ReviewResource {
    const COLLECTION: &'static str = "reviews";
    const SEARCH: SearchTarget = SearchTarget::Name;
}

/// Carts: plain documents, no normalization.
pub struct CartResource;

impl Resource for CartResource {
    const COLLECTION: &'static str = "carts";
    const SEARCH: SearchTarget = SearchTarget::Name;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_normalization_derives_slug_from_title() {
        let mut doc = json!({ "title": "Green Tea Premium" })
            .as_object()
            .cloned()
            .unwrap();
        ProductResource::normalize(&mut doc);
        assert_eq!(doc.get("slug"), Some(&json!("green-tea-premium")));
    }

    #[test]
    fn brand_normalization_derives_slug_from_name() {
        let mut doc = json!({ "name": "Nike Air" }).as_object().cloned().unwrap();
        BrandResource::normalize(&mut doc);
        assert_eq!(doc.get("slug"), Some(&json!("nike-air")));
    }

    #[test]
    fn normalization_without_source_field_is_a_no_op() {
        let mut doc = json!({ "ratings": 4 }).as_object().cloned().unwrap();
        ProductResource::normalize(&mut doc);
        assert!(!doc.contains_key("slug"));
    }
}
