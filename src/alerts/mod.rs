pub mod dispatcher;
pub mod telegram;

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

pub use dispatcher::AlertDispatcher;
pub use telegram::TelegramNotifier;

/// Outbound delivery of one formatted alert message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

/// Writes alerts to the log instead of delivering them. Used for dry runs
/// and when no Telegram credentials are configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        info!(event = "ALERT", "\n{message}");
        Ok(())
    }
}
