//! Request-time billing actions: starting checkout and portal sessions,
//! summarizing the current plan for display, and the debug-only manual grant.

use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_gateway::{
        BillingGateway, CheckoutMode, CheckoutSessionRequest,
    },
    application::use_cases::billing_events::ONE_TIME_ACCESS_DAYS,
    application::use_cases::subscription::{PlanRecordRepo, PlanRecordUpsert, classify},
    domain::entities::{plan_record::PlanRecord, subscription_level::SubscriptionLevel},
    infra::config::PriceCatalog,
};

/// Billing summary for the account page. `plan_name` is display-only and
/// degrades to `None` ("plan unknown") when the provider lookup fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub level: SubscriptionLevel,
    pub plan_name: Option<String>,
    pub one_time: bool,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

#[derive(Clone)]
pub struct BillingUseCases {
    records: Arc<dyn PlanRecordRepo>,
    gateway: Arc<dyn BillingGateway>,
    prices: PriceCatalog,
    base_url: Url,
}

impl BillingUseCases {
    pub fn new(
        records: Arc<dyn PlanRecordRepo>,
        gateway: Arc<dyn BillingGateway>,
        prices: PriceCatalog,
        base_url: Url,
    ) -> Self {
        Self {
            records,
            gateway,
            prices,
            base_url,
        }
    }

    /// Create a provider checkout session for the given price and return its
    /// redirect URL. Whether the session is one-time or recurring follows the
    /// price object, not local assumptions.
    pub async fn start_checkout(&self, user_id: Uuid, price_id: &str) -> AppResult<String> {
        let price = self.gateway.fetch_price(price_id).await?;
        let mode = if price.recurring {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        };

        let session = self
            .gateway
            .create_checkout_session(&CheckoutSessionRequest {
                user_id,
                price_id: price_id.to_string(),
                mode,
                success_url: self.page_url("billing/success"),
                cancel_url: self.page_url("billing"),
            })
            .await?;

        session.url.ok_or(AppError::CheckoutCreationFailed)
    }

    /// Self-service management requires an existing grant with a known
    /// billing customer.
    pub async fn start_portal_session(&self, user_id: Uuid) -> AppResult<String> {
        let record = self
            .records
            .get_by_user(user_id)
            .await?
            .ok_or(AppError::NoActiveSubscription)?;

        if record.stripe_customer_id.is_empty() {
            return Err(AppError::CustomerIdNotFound);
        }

        let session = self
            .gateway
            .create_portal_session(&record.stripe_customer_id, &self.page_url("billing"))
            .await?;

        session.url.ok_or(AppError::PortalCreationFailed)
    }

    pub async fn subscription_summary(&self, user_id: Uuid) -> AppResult<SubscriptionSummary> {
        let record = self.records.get_by_user(user_id).await?;
        let level = classify(record.as_ref(), Utc::now(), &self.prices);

        let Some(record) = record else {
            return Ok(SubscriptionSummary {
                level,
                plan_name: None,
                one_time: false,
                current_period_end: None,
                cancel_at_period_end: false,
            });
        };

        // Display-only lookup: a provider failure degrades to an unknown
        // plan name instead of failing the page.
        let plan_name = match self.gateway.fetch_price(&record.stripe_price_id).await {
            Ok(price) => price.product_name,
            Err(error) => {
                warn!(
                    %error,
                    price_id = %record.stripe_price_id,
                    "price lookup failed, reporting plan as unknown"
                );
                None
            }
        };

        Ok(SubscriptionSummary {
            level,
            plan_name,
            one_time: record.stripe_price_id == self.prices.one_time,
            current_period_end: Some(record.current_period_end),
            cancel_at_period_end: record.cancel_at_period_end,
        })
    }

    /// Debug-only path: upsert a plan record as if the corresponding billing
    /// event had been received.
    pub async fn manual_grant(
        &self,
        user_id: Uuid,
        plan: SubscriptionLevel,
    ) -> AppResult<PlanRecord> {
        let price_id = self
            .prices
            .price_for_level(plan)
            .ok_or_else(|| AppError::InvalidInput("invalid plan type".into()))?;

        let now = Utc::now();
        let current_period_end = if plan == SubscriptionLevel::OneTime {
            now + Duration::days(ONE_TIME_ACCESS_DAYS)
        } else {
            now + Months::new(1)
        };

        self.records
            .upsert(&PlanRecordUpsert {
                user_id,
                stripe_subscription_id: format!(
                    "manual_{}_{}",
                    plan.as_str(),
                    now.timestamp_millis()
                ),
                stripe_customer_id: format!("manual_customer_{user_id}"),
                stripe_price_id: price_id.to_string(),
                current_period_end,
                cancel_at_period_end: false,
            })
            .await
    }

    fn page_url(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{path}", self.base_url))
    }
}
