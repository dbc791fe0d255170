use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{app_error::AppResult, domain::entities::plan_record::SubscriptionStatus};

// ============================================================================
// Port Types - Provider-agnostic views of billing objects
// ============================================================================

/// A subscription as reported by the billing provider.
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: SubscriptionStatus,
    /// Price id of the first line item, when the subscription has one.
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    /// Value of the `userId` metadata key, when present.
    pub user_ref: Option<String>,
}

/// Checkout sessions are created in exactly one of the provider's two modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    /// One-time payment.
    Payment,
    /// Recurring subscription.
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Attached as session metadata; the event reconciler depends on it.
    pub user_id: Uuid,
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
}

/// A hosted checkout or portal session. The provider may omit the URL, which
/// callers must treat as a creation failure.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProviderPrice {
    pub id: String,
    pub recurring: bool,
    pub product_name: Option<String>,
    pub unit_amount: Option<i64>,
    pub currency: Option<String>,
}

// ============================================================================
// Billing Gateway Port
// ============================================================================

/// Billing provider operations the application depends on. The provider's
/// session/subscription semantics are inputs here, not something this service
/// redefines.
#[async_trait]
pub trait BillingGateway: Send + Sync {
    /// Fetch the full subscription object by id. Subscription lifecycle
    /// events only carry a reference; the reconciler needs the whole object.
    async fn fetch_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription>;

    /// Price id of the first line item of a checkout session, if any.
    async fn first_line_item_price(&self, checkout_session_id: &str) -> AppResult<Option<String>>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CreatedSession>;

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<CreatedSession>;

    async fn fetch_price(&self, price_id: &str) -> AppResult<ProviderPrice>;
}
