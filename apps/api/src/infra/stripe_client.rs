use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_gateway::{
        BillingGateway, CheckoutMode, CheckoutSessionRequest, CreatedSession, ProviderPrice,
        ProviderSubscription,
    },
    application::use_cases::billing_events::METADATA_USER_KEY,
    domain::entities::plan_record::SubscriptionStatus,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signature timestamps older than this are rejected.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            secret_key,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {encoded}")
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn get_subscription(&self, subscription_id: &str) -> AppResult<StripeSubscription> {
        let response = self
            .client
            .get(format!("{STRIPE_API_BASE}/subscriptions/{subscription_id}"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<StripeCheckoutSession> {
        let user_id = request.user_id.to_string();
        let mut params: Vec<(String, String)> = vec![
            ("line_items[0][price]".to_string(), request.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (format!("metadata[{METADATA_USER_KEY}]"), user_id.clone()),
        ];

        // The reconciler reads the user id off the subscription object too,
        // so subscription-mode sessions propagate it there.
        if request.mode == CheckoutMode::Subscription {
            params.push((
                format!("subscription_data[metadata][{METADATA_USER_KEY}]"),
                user_id,
            ));
        }

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    pub async fn list_checkout_line_items(
        &self,
        session_id: &str,
    ) -> AppResult<StripeLineItemList> {
        let response = self
            .client
            .get(format!(
                "{STRIPE_API_BASE}/checkout/sessions/{session_id}/line_items"
            ))
            .header("Authorization", self.auth_header())
            .query(&[("limit", "5")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Customer Portal
    // ========================================================================

    pub async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<StripePortalSession> {
        let params = vec![("customer", customer_id), ("return_url", return_url)];

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/billing_portal/sessions"))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Prices
    // ========================================================================

    pub async fn get_price(&self, price_id: &str) -> AppResult<StripePrice> {
        let response = self
            .client
            .get(format!("{STRIPE_API_BASE}/prices/{price_id}"))
            .header("Authorization", self.auth_header())
            .query(&[("expand[]", "product")])
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read Stripe response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::InvalidInput(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Internal(format!(
                "Stripe API error: {status} - {body}"
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {e}"))
        })
    }
}

// ============================================================================
// Webhook Signature Verification
// ============================================================================

/// Verify a Stripe-style `t=...,v1=...` signature header over the raw body.
///
/// Every cryptographic failure mode returns the same message so callers
/// cannot learn which part of the check failed.
pub fn verify_webhook_signature(
    payload: &str,
    signature_header: &str,
    webhook_secret: &str,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let invalid = || AppError::SignatureVerification("invalid signature".into());

    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in signature_header.split(',') {
        match part.splitn(2, '=').collect::<Vec<_>>()[..] {
            ["t", value] => timestamp = Some(value),
            ["v1", value] => signatures.push(value),
            _ => {}
        }
    }

    let timestamp: i64 = timestamp
        .and_then(|t| t.parse().ok())
        .ok_or_else(invalid)?;
    if signatures.is_empty() {
        return Err(invalid());
    }

    let now = chrono::Utc::now().timestamp();
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(invalid());
    }

    let signed_payload = format!("{timestamp}.{payload}");
    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures.iter().any(|sig| constant_time_compare(sig, &expected)) {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    /// "one_time" or "recurring".
    #[serde(rename = "type", default)]
    pub price_type: String,
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Present when fetched with `expand[]=product`.
    #[serde(default)]
    pub product: Option<serde_json::Value>,
}

impl StripePrice {
    pub fn is_recurring(&self) -> bool {
        self.price_type == "recurring"
    }

    pub fn product_name(&self) -> Option<String> {
        self.product
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(|n| n.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripePriceRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeLineItem {
    pub price: Option<StripePriceRef>,
}

#[derive(Debug, Deserialize)]
pub struct StripeLineItemList {
    pub data: Vec<StripeLineItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub items: StripeSubscriptionItems,
}

impl StripeSubscription {
    /// Price id of the first subscription item, if any.
    pub fn price_id(&self) -> Option<String> {
        self.items.data.first().map(|item| item.price.id.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePriceRef,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
}

// ============================================================================
// Billing Gateway Port Implementation
// ============================================================================

#[async_trait]
impl BillingGateway for StripeClient {
    async fn fetch_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        let subscription = self.get_subscription(subscription_id).await?;
        Ok(ProviderSubscription {
            price_id: subscription.price_id(),
            customer_id: subscription.customer,
            status: SubscriptionStatus::from_provider(&subscription.status),
            current_period_end: subscription
                .current_period_end
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            cancel_at_period_end: subscription.cancel_at_period_end,
            user_ref: subscription.metadata.get(METADATA_USER_KEY).cloned(),
            id: subscription.id,
        })
    }

    async fn first_line_item_price(&self, checkout_session_id: &str) -> AppResult<Option<String>> {
        let line_items = self.list_checkout_line_items(checkout_session_id).await?;
        Ok(line_items
            .data
            .first()
            .and_then(|item| item.price.as_ref())
            .map(|price| price.id.clone()))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CreatedSession> {
        let session = StripeClient::create_checkout_session(self, request).await?;
        Ok(CreatedSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<CreatedSession> {
        let session = StripeClient::create_portal_session(self, customer_id, return_url).await?;
        Ok(CreatedSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn fetch_price(&self, price_id: &str) -> AppResult<ProviderPrice> {
        let price = self.get_price(price_id).await?;
        Ok(ProviderPrice {
            recurring: price.is_recurring(),
            product_name: price.product_name(),
            unit_amount: price.unit_amount,
            currency: price.currency.clone(),
            id: price.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sign_webhook_payload;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &str = r#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let header = sign_webhook_payload(SECRET, chrono::Utc::now().timestamp(), BODY);
        assert!(verify_webhook_signature(BODY, &header, SECRET).is_ok());
    }

    #[test]
    fn rejects_a_wrong_secret() {
        let header = sign_webhook_payload("whsec_other", chrono::Utc::now().timestamp(), BODY);
        assert!(matches!(
            verify_webhook_signature(BODY, &header, SECRET),
            Err(AppError::SignatureVerification(_))
        ));
    }

    #[test]
    fn rejects_a_tampered_body() {
        let header = sign_webhook_payload(SECRET, chrono::Utc::now().timestamp(), BODY);
        let tampered = BODY.replace("evt_1", "evt_2");
        assert!(matches!(
            verify_webhook_signature(&tampered, &header, SECRET),
            Err(AppError::SignatureVerification(_))
        ));
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let old = chrono::Utc::now().timestamp() - SIGNATURE_TOLERANCE_SECS - 60;
        let header = sign_webhook_payload(SECRET, old, BODY);
        assert!(matches!(
            verify_webhook_signature(BODY, &header, SECRET),
            Err(AppError::SignatureVerification(_))
        ));
    }

    #[test]
    fn rejects_a_malformed_header() {
        for header in ["", "v1=deadbeef", "t=notanumber,v1=deadbeef", "t=123"] {
            assert!(
                verify_webhook_signature(BODY, header, SECRET).is_err(),
                "header {header:?} should be rejected"
            );
        }
    }

    #[test]
    fn failure_message_does_not_reveal_which_part_failed() {
        let now = chrono::Utc::now().timestamp();
        let wrong_secret = sign_webhook_payload("whsec_other", now, BODY);
        let stale = sign_webhook_payload(SECRET, now - 3600, BODY);

        let messages: Vec<String> = [wrong_secret, stale]
            .iter()
            .map(|header| {
                match verify_webhook_signature(BODY, header, SECRET) {
                    Err(AppError::SignatureVerification(msg)) => msg,
                    other => panic!("expected signature failure, got {other:?}"),
                }
            })
            .collect();
        assert_eq!(messages[0], messages[1]);
    }

    #[test]
    fn price_recurring_flag_follows_the_type_field() {
        let recurring: StripePrice = serde_json::from_str(
            r#"{"id":"price_1","type":"recurring","unit_amount":990,"currency":"usd"}"#,
        )
        .unwrap();
        let one_time: StripePrice = serde_json::from_str(
            r#"{"id":"price_2","type":"one_time","unit_amount":490,"currency":"usd"}"#,
        )
        .unwrap();
        assert!(recurring.is_recurring());
        assert!(!one_time.is_recurring());
    }

    #[test]
    fn subscription_price_id_reads_the_first_item() {
        let subscription: StripeSubscription = serde_json::from_str(
            r#"{
                "id": "sub_1",
                "customer": "cus_1",
                "status": "active",
                "current_period_end": 1760000000,
                "cancel_at_period_end": false,
                "metadata": {"userId": "3d1a2b84-9f2e-4a1c-8a45-0a4efbd7a001"},
                "items": {"data": [
                    {"id": "si_1", "price": {"id": "price_pro"}},
                    {"id": "si_2", "price": {"id": "price_other"}}
                ]}
            }"#,
        )
        .unwrap();
        assert_eq!(subscription.price_id().as_deref(), Some("price_pro"));
    }
}
