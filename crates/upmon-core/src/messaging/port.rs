use async_trait::async_trait;

use crate::Result;

/// Delivers a plain-text message to one fixed destination.
///
/// The destination and credential are bound at construction; the engine only
/// hands over text. Callers log failures and never retry through this port,
/// so implementations must be safe to call repeatedly.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
