//! Order/checkout workflow
//!
//! Converts a cart snapshot into an order, adjusts product stock and
//! reconciles with the payment gateway's webhook. The stock adjustment
//! runs after the order insert; if it fails, the freshly created order
//! is deleted again (compensating action) before the error propagates.

use std::sync::Arc;

use chrono::Utc;
use common::store::{Collection, Document, DocumentStore, Filter};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Cart, CartItem, ShippingAddress, User};
use crate::payment::{CheckoutSession, LineItem, PaymentGateway, WebhookEvent};
use crate::repositories::UserRepository;

const TAX_PRICE: f64 = 0.0;
const SHIPPING_PRICE: f64 = 0.0;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn Collection>,
    carts: Arc<dyn Collection>,
    products: Arc<dyn Collection>,
    users: UserRepository,
    gateway: Arc<dyn PaymentGateway>,
    frontend_url: String,
}

fn cart_total(cart: &Cart) -> f64 {
    cart.total_price_after_discount
        .unwrap_or(cart.total_cart_price)
}

fn parse_cart(doc: Document) -> ApiResult<Cart> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("malformed cart document: {e}")))
}

impl OrderService {
    pub fn new(
        store: &dyn DocumentStore,
        users: UserRepository,
        gateway: Arc<dyn PaymentGateway>,
        frontend_url: String,
    ) -> Self {
        Self {
            orders: store.collection("orders"),
            carts: store.collection("carts"),
            products: store.collection("products"),
            users,
            gateway,
            frontend_url,
        }
    }

    async fn load_cart(&self, cart_id: Uuid) -> ApiResult<Cart> {
        let doc = self
            .carts
            .find_by_id(cart_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no such cart with id {cart_id}")))?;
        parse_cart(doc)
    }

    fn order_doc(
        user_id: Uuid,
        cart: &Cart,
        shipping_address: Option<&ShippingAddress>,
        total_order_price: f64,
        payment_method_type: &str,
        is_paid: bool,
    ) -> ApiResult<Document> {
        let mut doc = Document::new();
        doc.insert("user".into(), Value::String(user_id.to_string()));
        doc.insert(
            "cart_items".into(),
            serde_json::to_value(&cart.cart_items)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        doc.insert(
            "shipping_address".into(),
            serde_json::to_value(shipping_address)
                .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        doc.insert("tax_price".into(), Value::from(TAX_PRICE));
        doc.insert("shipping_price".into(), Value::from(SHIPPING_PRICE));
        doc.insert("total_order_price".into(), Value::from(total_order_price));
        doc.insert(
            "payment_method_type".into(),
            Value::String(payment_method_type.to_string()),
        );
        doc.insert("is_paid".into(), Value::Bool(is_paid));
        if is_paid {
            doc.insert(
                "paid_at".into(),
                serde_json::to_value(Utc::now()).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
            );
        }
        doc.insert("is_delivered".into(), Value::Bool(false));
        Ok(doc)
    }

    /// Decrement stock and bump the sold counter for every cart line.
    async fn adjust_stock(&self, items: &[CartItem]) -> ApiResult<()> {
        let ops: Vec<(Filter, Vec<(String, f64)>)> = items
            .iter()
            .map(|item| {
                (
                    Filter::new().eq("id", item.product.to_string()),
                    vec![
                        ("quantity".to_string(), -f64::from(item.quantity)),
                        ("sold".to_string(), f64::from(item.quantity)),
                    ],
                )
            })
            .collect();
        self.products.bulk_increment(&ops).await?;
        Ok(())
    }

    /// Persist the order, adjust stock and delete the cart. The order
    /// is deleted again if the stock adjustment fails.
    async fn finalize_order(&self, order: Document, cart: &Cart) -> ApiResult<Document> {
        let stored = self.orders.insert(order).await?;
        let order_id = stored
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("order stored without id")))?;

        if let Err(err) = self.adjust_stock(&cart.cart_items).await {
            warn!("stock adjustment failed for order {order_id}, deleting order");
            if let Err(cleanup) = self.orders.delete_by_id(order_id).await {
                warn!("failed to delete order {order_id} during compensation: {cleanup}");
            }
            return Err(err);
        }

        self.carts.delete_by_id(cart.id).await?;
        info!("order {order_id} created from cart {}", cart.id);
        Ok(stored)
    }

    /// Create an order paid on delivery.
    pub async fn create_cash_order(
        &self,
        user: &User,
        cart_id: Uuid,
        shipping_address: Option<ShippingAddress>,
    ) -> ApiResult<Document> {
        let cart = self.load_cart(cart_id).await?;
        let total_order_price = cart_total(&cart) + TAX_PRICE + SHIPPING_PRICE;

        let order = Self::order_doc(
            user.id,
            &cart,
            shipping_address.as_ref(),
            total_order_price,
            "cash",
            false,
        )?;
        self.finalize_order(order, &cart).await
    }

    /// Open a gateway checkout session for a cart.
    pub async fn checkout_session(
        &self,
        user: &User,
        cart_id: Uuid,
        shipping_address: Option<ShippingAddress>,
    ) -> ApiResult<CheckoutSession> {
        let cart = self.load_cart(cart_id).await?;
        let total = cart_total(&cart);

        let line_items = vec![LineItem {
            name: user.name.clone(),
            amount_minor: (total * 100.0).round() as i64,
            quantity: 1,
        }];
        let session = self
            .gateway
            .create_checkout_session(
                line_items,
                &format!("{}/orders", self.frontend_url),
                &format!("{}/cart", self.frontend_url),
                &user.email,
                &cart_id.to_string(),
                shipping_address,
            )
            .await
            .map_err(ApiError::Internal)?;
        Ok(session)
    }

    /// Handle a verified webhook event: a completed checkout session
    /// becomes a paid card order, with the same stock adjustment and
    /// cart deletion as the cash path.
    pub async fn handle_webhook_event(&self, event: WebhookEvent) -> ApiResult<()> {
        let session = match event {
            WebhookEvent::CheckoutSessionCompleted(session) => session,
            WebhookEvent::Other => return Ok(()),
        };

        let cart_id = Uuid::parse_str(&session.client_reference_id).map_err(|_| {
            ApiError::BadRequest("webhook session carries no valid cart reference".to_string())
        })?;
        let cart = self.load_cart(cart_id).await?;

        let user = self
            .users
            .find_by_email(&session.customer_email)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("no user for email {}", session.customer_email))
            })?;

        let total_order_price = session.amount_total as f64 / 100.0;
        let mut order = Self::order_doc(
            user.id,
            &cart,
            session.metadata.as_ref(),
            total_order_price,
            "card",
            true,
        )?;
        order.insert(
            "checkout_session".into(),
            Value::String(session.id.clone()),
        );

        self.finalize_order(order, &cart).await?;
        Ok(())
    }

    /// Mark an order paid (admin/manager action).
    pub async fn mark_paid(&self, order_id: Uuid) -> ApiResult<Document> {
        let mut patch = Document::new();
        patch.insert("is_paid".into(), Value::Bool(true));
        patch.insert(
            "paid_at".into(),
            serde_json::to_value(Utc::now()).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        self.orders
            .update_by_id(order_id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no order with id {order_id}")))
    }

    /// Mark an order delivered (admin/manager action).
    pub async fn mark_delivered(&self, order_id: Uuid) -> ApiResult<Document> {
        let mut patch = Document::new();
        patch.insert("is_delivered".into(), Value::Bool(true));
        patch.insert(
            "delivered_at".into(),
            serde_json::to_value(Utc::now()).map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?,
        );
        self.orders
            .update_by_id(order_id, patch)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("no order with id {order_id}")))
    }
}
