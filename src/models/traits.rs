use async_trait::async_trait;

use super::types::CompletionRequest;
use crate::utils::Result;

/// Remote chat-completion backend.
///
/// Implementations return the assistant text, or `CompletionService` for any
/// transport, status or payload failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
