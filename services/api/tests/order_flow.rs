//! Order/checkout workflow against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use api::error::ApiError;
use api::models::{NewUser, Role, User};
use api::orders::OrderService;
use api::payment::{DevGateway, PaymentGateway, WebhookError};
use api::repositories::UserRepository;
use common::error::{StoreError, StoreResult};
use common::store::{
    Collection, Document, DocumentStore, Filter, MemoryStore, Projection, SortKey,
};

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn id_of(doc: &Document) -> Uuid {
    doc.get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap()
}

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<DevGateway>,
    orders: OrderService,
    user: User,
}

async fn seed_user(store: &dyn DocumentStore) -> User {
    UserRepository::new(store)
        .create(
            &NewUser {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                password: "ignored".into(),
            },
            "argon2-hash".into(),
            Role::User,
        )
        .await
        .unwrap()
}

async fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new().with_unique("users", "email"));
    let user = seed_user(store.as_ref()).await;
    let gateway = Arc::new(DevGateway::new("whsec_test".into()));
    let orders = OrderService::new(
        store.as_ref(),
        UserRepository::new(store.as_ref()),
        gateway.clone(),
        "http://localhost:5173".into(),
    );
    Harness {
        store,
        gateway,
        orders,
        user,
    }
}

impl Harness {
    /// Seed a product with 8 in stock and a cart holding `quantity` of
    /// it, priced 200 with a 180 discount total. Returns
    /// (product_id, cart_id).
    async fn seed_cart(&self, quantity: u32) -> (Uuid, Uuid) {
        let products = self.store.collection("products");
        let product = products
            .insert(doc(json!({
                "title": "Ceramic Teapot",
                "price": 100.0,
                "quantity": 8,
                "sold": 0,
            })))
            .await
            .unwrap();
        let product_id = id_of(&product);

        let carts = self.store.collection("carts");
        let cart = carts
            .insert(doc(json!({
                "user": self.user.id,
                "cart_items": [{
                    "product": product_id,
                    "quantity": quantity,
                    "price": 100.0,
                }],
                "total_cart_price": 200.0,
                "total_price_after_discount": 180.0,
            })))
            .await
            .unwrap();
        (product_id, id_of(&cart))
    }
}

#[tokio::test]
async fn cash_order_adjusts_stock_and_clears_the_cart() {
    let h = harness().await;
    let (product_id, cart_id) = h.seed_cart(2).await;

    let order = h
        .orders
        .create_cash_order(&h.user, cart_id, None)
        .await
        .unwrap();

    assert_eq!(order.get("payment_method_type"), Some(&json!("cash")));
    assert_eq!(order.get("is_paid"), Some(&json!(false)));
    assert_eq!(order.get("total_order_price"), Some(&json!(180.0)));
    assert_eq!(
        order.get("user").and_then(Value::as_str),
        Some(h.user.id.to_string().as_str())
    );

    let product = h
        .store
        .collection("products")
        .find_by_id(product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.get("quantity"), Some(&json!(6)));
    assert_eq!(product.get("sold"), Some(&json!(2)));

    let cart = h
        .store
        .collection("carts")
        .find_by_id(cart_id)
        .await
        .unwrap();
    assert!(cart.is_none());
}

#[tokio::test]
async fn cash_order_for_a_missing_cart_is_not_found() {
    let h = harness().await;
    let err = h
        .orders
        .create_cash_order(&h.user, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn checkout_session_carries_the_cart_reference_and_total() {
    let h = harness().await;
    let (_, cart_id) = h.seed_cart(2).await;

    let session = h
        .orders
        .checkout_session(&h.user, cart_id, None)
        .await
        .unwrap();

    assert_eq!(session.client_reference_id, cart_id.to_string());
    assert_eq!(session.amount_total, 18_000);
    assert_eq!(session.customer_email, h.user.email);

    // The cart is untouched until the gateway confirms payment.
    assert!(h
        .store
        .collection("carts")
        .find_by_id(cart_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn webhook_completion_creates_a_paid_card_order() {
    let h = harness().await;
    let (product_id, cart_id) = h.seed_cart(3).await;

    let session = h
        .orders
        .checkout_session(&h.user, cart_id, None)
        .await
        .unwrap();
    let payload = serde_json::to_vec(&json!({
        "type": "checkout.session.completed",
        "data": session,
    }))
    .unwrap();
    let signature = h.gateway.sign(&payload);

    let event = h.gateway.verify_webhook(&payload, &signature).unwrap();
    h.orders.handle_webhook_event(event).await.unwrap();

    let orders = h
        .store
        .collection("orders")
        .find(&Filter::new(), &Projection::Default, &[], 0, 0)
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.get("payment_method_type"), Some(&json!("card")));
    assert_eq!(order.get("is_paid"), Some(&json!(true)));
    assert_eq!(order.get("total_order_price"), Some(&json!(180.0)));
    assert!(order.get("paid_at").is_some());

    let product = h
        .store
        .collection("products")
        .find_by_id(product_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.get("quantity"), Some(&json!(5)));
    assert_eq!(product.get("sold"), Some(&json!(3)));

    assert!(h
        .store
        .collection("carts")
        .find_by_id(cart_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn webhook_with_a_bad_signature_is_rejected() {
    let h = harness().await;
    let payload = br#"{"type":"checkout.session.completed","data":{}}"#;

    let err = h.gateway.verify_webhook(payload, "tampered").unwrap_err();
    assert!(matches!(err, WebhookError::BadSignature));
}

#[tokio::test]
async fn mark_paid_and_delivered_stamp_the_order() {
    let h = harness().await;
    let (_, cart_id) = h.seed_cart(1).await;
    let order = h
        .orders
        .create_cash_order(&h.user, cart_id, None)
        .await
        .unwrap();
    let order_id = id_of(&order);

    let paid = h.orders.mark_paid(order_id).await.unwrap();
    assert_eq!(paid.get("is_paid"), Some(&json!(true)));
    assert!(paid.get("paid_at").is_some());

    let delivered = h.orders.mark_delivered(order_id).await.unwrap();
    assert_eq!(delivered.get("is_delivered"), Some(&json!(true)));
    assert!(delivered.get("delivered_at").is_some());

    let missing = h.orders.mark_paid(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));
}

/// Store whose `products` collection refuses increments, to drive the
/// order-creation path into its compensating delete.
struct FailingStockStore {
    inner: Arc<MemoryStore>,
}

struct FailingStockCollection {
    inner: Arc<dyn Collection>,
}

#[async_trait]
impl Collection for FailingStockCollection {
    async fn find(
        &self,
        filter: &Filter,
        projection: &Projection,
        sort: &[SortKey],
        skip: u64,
        limit: u64,
    ) -> StoreResult<Vec<Document>> {
        self.inner.find(filter, projection, sort, skip, limit).await
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        self.inner.find_one(filter).await
    }

    async fn count(&self, filter: &Filter) -> StoreResult<u64> {
        self.inner.count(filter).await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        self.inner.find_by_id(id).await
    }

    async fn insert(&self, doc: Document) -> StoreResult<Document> {
        self.inner.insert(doc).await
    }

    async fn update_by_id(&self, id: Uuid, patch: Document) -> StoreResult<Option<Document>> {
        self.inner.update_by_id(id, patch).await
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        self.inner.delete_by_id(id).await
    }

    async fn bulk_increment(&self, _ops: &[(Filter, Vec<(String, f64)>)]) -> StoreResult<u64> {
        Err(StoreError::Backend("stock backend unavailable".into()))
    }
}

impl DocumentStore for FailingStockStore {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        let inner = self.inner.collection(name);
        if name == "products" {
            Arc::new(FailingStockCollection { inner })
        } else {
            inner
        }
    }
}

#[tokio::test]
async fn stock_failure_deletes_the_freshly_created_order() {
    let memory = Arc::new(MemoryStore::new().with_unique("users", "email"));
    let store = FailingStockStore {
        inner: memory.clone(),
    };
    let user = seed_user(&store).await;
    let orders_service = OrderService::new(
        &store,
        UserRepository::new(&store),
        Arc::new(DevGateway::new("whsec_test".into())),
        "http://localhost:5173".into(),
    );

    let cart = memory
        .collection("carts")
        .insert(doc(json!({
            "user": user.id,
            "cart_items": [{
                "product": Uuid::new_v4(),
                "quantity": 1,
                "price": 50.0,
            }],
            "total_cart_price": 50.0,
        })))
        .await
        .unwrap();
    let cart_id = id_of(&cart);

    let err = orders_service
        .create_cash_order(&user, cart_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Internal(_)));

    // Compensation: no half-created order survives, the cart stays.
    let orders = memory
        .collection("orders")
        .find(&Filter::new(), &Projection::Default, &[], 0, 0)
        .await
        .unwrap();
    assert!(orders.is_empty());
    assert!(memory
        .collection("carts")
        .find_by_id(cart_id)
        .await
        .unwrap()
        .is_some());
}
