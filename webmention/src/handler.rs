//! Application callback invoked for every verified mention.

use std::future::Future;

use async_trait::async_trait;
use tracing::info;

use crate::queue::VerifiedMention;

/// Receives verified mentions from the processor.
///
/// An error is logged by the processor; the mention is not retried.
#[async_trait]
pub trait MentionHandler: Send + Sync {
    async fn handle(&self, mention: VerifiedMention) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> MentionHandler for F
where
    F: Fn(VerifiedMention) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, mention: VerifiedMention) -> anyhow::Result<()> {
        (self)(mention).await
    }
}

/// Writes each verified mention to the log as structured JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl MentionHandler for LoggingHandler {
    async fn handle(&self, mention: VerifiedMention) -> anyhow::Result<()> {
        let entry_name = mention
            .data
            .as_ref()
            .and_then(|data| data.items.first())
            .and_then(|item| item.first_text("name"))
            .map(str::to_string);
        let data = serde_json::to_string(&mention.data)?;

        info!(
            source = %mention.source,
            target = %mention.target,
            has_mf2 = mention.data.is_some(),
            entry_name = ?entry_name,
            mf2 = %data,
            "webmention_received"
        );
        Ok(())
    }
}
