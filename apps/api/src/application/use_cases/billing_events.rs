//! Reconciliation of billing-provider lifecycle events into plan records.
//!
//! The provider delivers events at-least-once with no ordering guarantee, so
//! every handler converges under redelivery: grants are upserts keyed by user
//! id, removals are idempotent deletes. One verified event in, one consistent
//! store state out.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        billing_gateway::BillingGateway, identity_directory::IdentityDirectory,
    },
    application::use_cases::subscription::{PlanRecordRepo, PlanRecordUpsert},
    infra::config::PriceCatalog,
};

/// Validity window of a one-time purchase.
pub const ONE_TIME_ACCESS_DAYS: i64 = 15;

/// Metadata key the checkout and subscription objects carry the user id in.
pub const METADATA_USER_KEY: &str = "userId";

// ============================================================================
// Event Envelope
// ============================================================================

/// The provider's signed event envelope. `data.object` is event-kind
/// specific and may only be a reference requiring a follow-up fetch.
#[derive(Debug, Clone, Deserialize)]
pub struct BillingEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: BillingEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckoutSessionPayload {
    id: String,
    #[serde(default)]
    mode: String,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Subscription events only need the id (created/updated trigger a fetch of
/// the current object) plus metadata for the deletion path.
#[derive(Debug, Clone, Deserialize)]
struct SubscriptionPayload {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

fn parse_object<T: serde::de::DeserializeOwned>(object: &serde_json::Value) -> AppResult<T> {
    serde_json::from_value(object.clone())
        .map_err(|e| AppError::InvalidInput(format!("malformed event object: {e}")))
}

fn require_user_metadata(metadata: &HashMap<String, String>, context: &str) -> AppResult<Uuid> {
    metadata
        .get(METADATA_USER_KEY)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::MissingEventMetadata(format!("no usable userId on {context}")))
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingEventUseCases {
    records: Arc<dyn PlanRecordRepo>,
    gateway: Arc<dyn BillingGateway>,
    directory: Arc<dyn IdentityDirectory>,
    prices: PriceCatalog,
}

impl BillingEventUseCases {
    pub fn new(
        records: Arc<dyn PlanRecordRepo>,
        gateway: Arc<dyn BillingGateway>,
        directory: Arc<dyn IdentityDirectory>,
        prices: PriceCatalog,
    ) -> Self {
        Self {
            records,
            gateway,
            directory,
            prices,
        }
    }

    /// Handle one authenticated event. Errors mean the event must be
    /// redelivered; no partial plan-record mutation precedes an error.
    pub async fn handle_event(&self, event: &BillingEvent) -> AppResult<()> {
        match event.kind.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionPayload = parse_object(&event.data.object)?;
                self.handle_checkout_completed(&session).await
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                let subscription: SubscriptionPayload = parse_object(&event.data.object)?;
                self.handle_subscription_changed(&subscription.id).await
            }
            "customer.subscription.deleted" => {
                let subscription: SubscriptionPayload = parse_object(&event.data.object)?;
                self.handle_subscription_deleted(&subscription).await
            }
            other => {
                debug!(kind = other, "ignoring unhandled billing event kind");
                Ok(())
            }
        }
    }

    /// One-time purchases arrive as completed checkout sessions in `payment`
    /// mode. Subscription-mode sessions are reconciled through their
    /// subscription events instead.
    async fn handle_checkout_completed(&self, session: &CheckoutSessionPayload) -> AppResult<()> {
        let user_id = require_user_metadata(&session.metadata, "checkout session")?;

        if let Some(customer_id) = session.customer.as_deref() {
            self.sync_identity_customer(user_id, customer_id);
        }

        if session.mode != "payment" {
            debug!(
                session_id = %session.id,
                mode = %session.mode,
                "checkout session is not a one-time payment, nothing to reconcile"
            );
            return Ok(());
        }

        let price_id = self
            .gateway
            .first_line_item_price(&session.id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "checkout session {} has no line item price",
                    session.id
                ))
            })?;

        if price_id != self.prices.one_time {
            info!(
                session_id = %session.id,
                price_id = %price_id,
                "checkout price does not match the one-time plan, skipping"
            );
            return Ok(());
        }

        let customer_id = session
            .customer
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| format!("temp_customer_{user_id}"));

        let record = self
            .records
            .upsert(&PlanRecordUpsert {
                user_id,
                stripe_subscription_id: format!("one_time_{}", session.id),
                stripe_customer_id: customer_id,
                stripe_price_id: price_id,
                current_period_end: Utc::now() + Duration::days(ONE_TIME_ACCESS_DAYS),
                cancel_at_period_end: false,
            })
            .await?;

        info!(
            user_id = %record.user_id,
            period_end = %record.current_period_end,
            "granted one-time access"
        );
        Ok(())
    }

    /// Created/updated events carry a stale snapshot, so the current object
    /// is fetched by id. Alive statuses upsert the grant; anything else
    /// removes every record for the subscription's customer.
    async fn handle_subscription_changed(&self, subscription_id: &str) -> AppResult<()> {
        let subscription = self.gateway.fetch_subscription(subscription_id).await?;

        let user_id = subscription
            .user_ref
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| {
                AppError::MissingEventMetadata(format!(
                    "no usable userId on subscription {subscription_id}"
                ))
            })?;

        if !subscription.status.keeps_grant() {
            let deleted = self
                .records
                .delete_by_customer(&subscription.customer_id)
                .await?;
            info!(
                customer_id = %subscription.customer_id,
                status = subscription.status.as_str(),
                deleted,
                "subscription no longer active, removed matching plan records"
            );
            return Ok(());
        }

        let price_id = subscription.price_id.clone().ok_or_else(|| {
            AppError::Internal(format!(
                "subscription {subscription_id} has no line item price"
            ))
        })?;
        let current_period_end = subscription.current_period_end.ok_or_else(|| {
            AppError::Internal(format!(
                "subscription {subscription_id} has no current period end"
            ))
        })?;

        let record = self
            .records
            .upsert(&PlanRecordUpsert {
                user_id,
                stripe_subscription_id: subscription.id.clone(),
                stripe_customer_id: subscription.customer_id.clone(),
                stripe_price_id: price_id,
                current_period_end,
                cancel_at_period_end: subscription.cancel_at_period_end,
            })
            .await?;

        self.sync_identity_customer(user_id, &subscription.customer_id);

        info!(
            user_id = %record.user_id,
            subscription_id = %record.stripe_subscription_id,
            status = subscription.status.as_str(),
            period_end = %record.current_period_end,
            "reconciled subscription grant"
        );
        Ok(())
    }

    /// Deletion is best-effort: the record may already be gone (or never have
    /// existed), and a missing user reference cannot fail anything that the
    /// not-alive path of an update would not also clean up.
    async fn handle_subscription_deleted(&self, subscription: &SubscriptionPayload) -> AppResult<()> {
        let Some(user_id) = subscription
            .metadata
            .get(METADATA_USER_KEY)
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            warn!(
                subscription_id = %subscription.id,
                "subscription deletion without usable userId metadata, nothing to do"
            );
            return Ok(());
        };

        if self.records.delete_by_user(user_id).await? {
            info!(%user_id, "deleted plan record for terminated subscription");
        } else {
            debug!(%user_id, "no plan record to delete, it may have been removed already");
        }
        Ok(())
    }

    /// The plan-record upsert is the authoritative outcome; this side channel
    /// runs detached and only ever logs.
    fn sync_identity_customer(&self, user_id: Uuid, customer_id: &str) {
        if customer_id.is_empty() {
            return;
        }
        let directory = Arc::clone(&self.directory);
        let customer_id = customer_id.to_string();
        tokio::spawn(async move {
            if let Err(error) = directory.record_billing_customer(user_id, &customer_id).await {
                warn!(
                    %user_id,
                    %error,
                    "failed to sync billing customer id to identity profile"
                );
            }
        });
    }
}
