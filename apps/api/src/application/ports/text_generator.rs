use async_trait::async_trait;

use crate::app_error::AppResult;

/// Opaque generate-text capability. Callers assemble one system instruction
/// and one user message; everything else is the provider's concern.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> AppResult<String>;
}
