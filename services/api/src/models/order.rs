//! Cart and order models

use chrono::{DateTime, Utc};
use common::query::SearchTarget;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crud::Resource;

/// One line of a cart (and of the order snapshot taken from it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Uuid,
    pub quantity: u32,
    pub price: f64,
}

/// Cart as persisted in the `carts` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: Uuid,
    pub user: Uuid,
    pub cart_items: Vec<CartItem>,
    pub total_cart_price: f64,
    #[serde(default)]
    pub total_price_after_discount: Option<f64>,
}

/// Shipping address carried on an order (and through checkout-session
/// metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Order snapshot created from a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user: Uuid,
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    pub tax_price: f64,
    pub shipping_price: f64,
    pub total_order_price: f64,
    pub payment_method_type: String,
    pub is_paid: bool,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Orders as a listable resource (admin listing, logged-user scoping).
pub struct OrderResource;

impl Resource for OrderResource {
    const COLLECTION: &'static str = "orders";
    const SEARCH: SearchTarget = SearchTarget::Name;
}
