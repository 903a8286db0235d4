//! Data model definitions
//!
//! Models are plain data; lifecycle behavior the original schema hooks
//! carried (slug generation, password hashing) lives in the services
//! that persist them.

pub mod catalog;
pub mod order;
pub mod user;

pub use catalog::{
    BrandResource, CartResource, CategoryResource, ProductResource, ReviewResource,
    SubCategoryResource,
};
pub use order::{Cart, CartItem, Order, OrderResource, ShippingAddress};
pub use user::{sanitize_user_doc, NewUser, Role, User, UserResource, UserResponse};

/// Build a URL-safe slug from a title or name: lowercase, alphanumeric
/// runs joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
