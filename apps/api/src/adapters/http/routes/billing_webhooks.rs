//! Inbound billing-provider webhook endpoint.
//!
//! Response contract: 400 on signature failure (nothing touched), 200 on
//! handled events and accepted no-ops, 500 on handling errors so the
//! provider's retry policy takes over.

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use secrecy::ExposeSecret;
use tracing::{error, info};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::use_cases::billing_events::BillingEvent,
    infra::stripe_client::verify_webhook_signature,
};

/// POST /api/billing/webhook
async fn handle_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(signature) = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    else {
        return AppError::SignatureVerification("missing stripe-signature header".into())
            .into_response();
    };

    let secret = app_state.config.stripe_webhook_secret.expose_secret();
    if let Err(error) = verify_webhook_signature(&body, signature, secret) {
        return error.into_response();
    }

    let event: BillingEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            return AppError::InvalidInput(format!("invalid webhook payload: {e}")).into_response();
        }
    };

    info!(kind = %event.kind, event_id = %event.id, "received billing event");

    match app_state.billing_events.handle_event(&event).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            error!(
                %error,
                kind = %event.kind,
                event_id = %event.id,
                "billing event handling failed, returning 500 for provider retry"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/billing/webhook", post(handle_webhook))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum_test::TestServer;
    use serde_json::json;
    use uuid::Uuid;

    use crate::test_utils::{
        MockBillingGateway, TEST_WEBHOOK_SECRET, TestAppStateBuilder, sign_webhook_payload,
        test_prices,
    };

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(Router::new().merge(router()).with_state(app_state)).unwrap()
    }

    fn signed_header(body: &str) -> String {
        sign_webhook_payload(TEST_WEBHOOK_SECRET, chrono::Utc::now().timestamp(), body)
    }

    fn checkout_body(user_id: Uuid) -> String {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "mode": "payment",
                "customer": "cus_1",
                "metadata": { "userId": user_id.to_string() },
            }},
        })
        .to_string()
    }

    #[tokio::test]
    async fn missing_signature_is_rejected_without_mutation() {
        let builder = TestAppStateBuilder::new();
        let records = builder.records();
        let server = server(builder.build());

        let response = server
            .post("/billing/webhook")
            .text(checkout_body(Uuid::new_v4()))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(records.len(), 0);
    }

    #[tokio::test]
    async fn invalid_signature_is_rejected_without_mutation() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new().with_gateway(
            MockBillingGateway::new().with_line_item_price("cs_1", &test_prices().one_time),
        );
        let records = builder.records();
        let server = server(builder.build());

        let body = checkout_body(user_id);
        let header = sign_webhook_payload("whsec_wrong", chrono::Utc::now().timestamp(), &body);
        let response = server
            .post("/billing/webhook")
            .add_header("stripe-signature", header)
            .text(body)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(records.len(), 0);
    }

    #[tokio::test]
    async fn signed_checkout_event_creates_a_plan_record() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new().with_gateway(
            MockBillingGateway::new().with_line_item_price("cs_1", &test_prices().one_time),
        );
        let records = builder.records();
        let server = server(builder.build());

        let body = checkout_body(user_id);
        let response = server
            .post("/billing/webhook")
            .add_header("stripe-signature", signed_header(&body))
            .text(body)
            .await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            records.get(user_id).unwrap().stripe_subscription_id,
            "one_time_cs_1"
        );
    }

    #[tokio::test]
    async fn signed_replay_converges_to_one_record() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new().with_gateway(
            MockBillingGateway::new().with_line_item_price("cs_1", &test_prices().one_time),
        );
        let records = builder.records();
        let server = server(builder.build());

        let body = checkout_body(user_id);
        for _ in 0..2 {
            let response = server
                .post("/billing/webhook")
                .add_header("stripe-signature", signed_header(&body))
                .text(body.clone())
                .await;
            response.assert_status(StatusCode::OK);
        }

        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn unhandled_event_kinds_return_200() {
        let server = server(TestAppStateBuilder::new().build());

        let body = json!({
            "id": "evt_2",
            "type": "invoice.paid",
            "data": { "object": { "id": "in_1" } },
        })
        .to_string();
        let response = server
            .post("/billing/webhook")
            .add_header("stripe-signature", signed_header(&body))
            .text(body)
            .await;

        response.assert_status(StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_event_metadata_returns_500_for_retry() {
        let builder = TestAppStateBuilder::new().with_gateway(
            MockBillingGateway::new().with_line_item_price("cs_1", &test_prices().one_time),
        );
        let records = builder.records();
        let server = server(builder.build());

        let body = json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_1",
                "mode": "payment",
                "customer": "cus_1",
                "metadata": {},
            }},
        })
        .to_string();
        let response = server
            .post("/billing/webhook")
            .add_header("stripe-signature", signed_header(&body))
            .text(body)
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(records.len(), 0);
    }

    #[tokio::test]
    async fn malformed_json_with_a_valid_signature_is_a_client_error() {
        let server = server(TestAppStateBuilder::new().build());

        let body = "not json at all";
        let response = server
            .post("/billing/webhook")
            .add_header("stripe-signature", signed_header(body))
            .text(body)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
