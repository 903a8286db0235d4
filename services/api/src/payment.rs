//! Payment gateway collaborator
//!
//! Session creation and webhook signature verification belong to the
//! external gateway; the core depends on this trait only. `DevGateway`
//! is the bundled stand-in used by the dev server and the tests: it
//! fabricates sessions and verifies webhooks against a shared-secret
//! digest of the raw payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::ShippingAddress;
use crate::security::hash_token;

/// One purchasable line of a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub quantity: u32,
}

/// A checkout session as created by (and echoed back from) the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
    pub customer_email: String,
    /// Cart id, threaded through to the webhook.
    pub client_reference_id: String,
    /// Total in minor currency units.
    pub amount_total: i64,
    #[serde(default)]
    pub metadata: Option<ShippingAddress>,
}

/// Parsed webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WebhookEvent {
    #[serde(rename = "checkout.session.completed")]
    CheckoutSessionCompleted(CheckoutSession),
    #[serde(other)]
    Other,
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("webhook signature verification failed")]
    BadSignature,
    #[error("malformed webhook payload: {0}")]
    BadPayload(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create_checkout_session(
        &self,
        line_items: Vec<LineItem>,
        success_url: &str,
        cancel_url: &str,
        customer_email: &str,
        client_reference_id: &str,
        metadata: Option<ShippingAddress>,
    ) -> anyhow::Result<CheckoutSession>;

    /// Verify the raw payload against the signature header and parse
    /// the event. Failures must not be retried by the caller.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookError>;
}

/// Shared-secret development gateway.
pub struct DevGateway {
    webhook_secret: String,
}

impl DevGateway {
    pub fn new(webhook_secret: String) -> Self {
        Self { webhook_secret }
    }

    /// Signature for a payload, as the dev gateway computes it. Exposed
    /// so tests and local tooling can forge valid webhook calls.
    pub fn sign(&self, payload: &[u8]) -> String {
        let body = String::from_utf8_lossy(payload);
        hash_token(&format!("{}:{}", self.webhook_secret, body))
    }
}

#[async_trait]
impl PaymentGateway for DevGateway {
    async fn create_checkout_session(
        &self,
        line_items: Vec<LineItem>,
        success_url: &str,
        _cancel_url: &str,
        customer_email: &str,
        client_reference_id: &str,
        metadata: Option<ShippingAddress>,
    ) -> anyhow::Result<CheckoutSession> {
        let amount_total = line_items
            .iter()
            .map(|item| item.amount_minor * i64::from(item.quantity))
            .sum();
        let id = format!("cs_dev_{}", Uuid::new_v4().simple());
        info!(session = %id, %customer_email, "created dev checkout session");

        Ok(CheckoutSession {
            url: format!("{success_url}?session={id}"),
            id,
            customer_email: customer_email.to_string(),
            client_reference_id: client_reference_id.to_string(),
            amount_total,
            metadata,
        })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, WebhookError> {
        if self.sign(payload) != signature {
            return Err(WebhookError::BadSignature);
        }
        serde_json::from_slice(payload).map_err(|e| WebhookError::BadPayload(e.to_string()))
    }
}
