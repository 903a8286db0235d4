//! Outbound email collaborator
//!
//! Delivery itself is external; the core only depends on this trait.

use async_trait::async_trait;
use tracing::info;

/// Email sender seam. The auth flow treats a send failure as a hard
/// error and rolls back any state that assumed the user was notified.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Development mailer: logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(%to, %subject, "outbound email (dev mode, not delivered)\n{body}");
        Ok(())
    }
}
