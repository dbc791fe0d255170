use async_trait::async_trait;
use uuid::Uuid;

use crate::app_error::AppResult;

/// Identity-provider user directory. The only write this service performs is
/// the best-effort association of a billing customer id with a user profile.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn record_billing_customer(&self, user_id: Uuid, customer_id: &str) -> AppResult<()>;
}
