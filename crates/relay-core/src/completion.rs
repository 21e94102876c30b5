use async_trait::async_trait;

use crate::Result;

/// Single-shot, stateless text completion.
///
/// The prompt is sent as the only user message; no earlier turns are included.
/// Failures are reported as [`crate::Error::Completion`].
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
