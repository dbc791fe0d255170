//! Authenticated billing actions: checkout, self-service portal, and the
//! account page's subscription summary.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    app_error::AppResult,
    application::use_cases::billing::SubscriptionSummary,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest {
    price_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RedirectResponse {
    redirect_url: String,
}

/// POST /api/billing/checkout
async fn start_checkout(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> AppResult<Json<RedirectResponse>> {
    let redirect_url = app_state
        .billing
        .start_checkout(user_id, &body.price_id)
        .await?;
    Ok(Json(RedirectResponse { redirect_url }))
}

/// POST /api/billing/portal
async fn start_portal(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<RedirectResponse>> {
    let redirect_url = app_state.billing.start_portal_session(user_id).await?;
    Ok(Json(RedirectResponse { redirect_url }))
}

/// GET /api/billing/subscription
async fn subscription_summary(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<SubscriptionSummary>> {
    let summary = app_state.billing.subscription_summary(user_id).await?;
    Ok(Json(summary))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(start_checkout))
        .route("/portal", post(start_portal))
        .route("/subscription", get(subscription_summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use crate::{
        application::ports::billing_gateway::ProviderPrice,
        test_utils::{
            MockBillingGateway, TestAppStateBuilder, bearer_for, create_test_plan_record,
            test_prices,
        },
    };

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(Router::new().merge(router()).with_state(app_state)).unwrap()
    }

    #[tokio::test]
    async fn checkout_requires_authentication() {
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/checkout")
            .json(&json!({ "priceId": "price_x" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn checkout_returns_the_redirect_url() {
        let prices = test_prices();
        let gateway = MockBillingGateway::new()
            .with_price(ProviderPrice {
                id: prices.pro_monthly.clone(),
                recurring: true,
                product_name: Some("Pro".into()),
                unit_amount: Some(990),
                currency: Some("usd".into()),
            })
            .with_checkout_url("https://billing.test/session/cs_1");
        let server = server(TestAppStateBuilder::new().with_gateway(gateway).build());

        let response = server
            .post("/checkout")
            .add_header("authorization", bearer_for(Uuid::new_v4()))
            .json(&json!({ "priceId": prices.pro_monthly }))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["redirectUrl"], "https://billing.test/session/cs_1");
    }

    #[tokio::test]
    async fn portal_without_a_record_reports_no_active_subscription() {
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/portal")
            .add_header("authorization", bearer_for(Uuid::new_v4()))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "NO_ACTIVE_SUBSCRIPTION");
    }

    #[tokio::test]
    async fn portal_without_a_customer_id_reports_the_specific_error() {
        let user_id = Uuid::new_v4();
        let server = server(
            TestAppStateBuilder::new()
                .with_plan_record(create_test_plan_record(user_id, |r| {
                    r.stripe_customer_id = String::new();
                }))
                .build(),
        );

        let response = server
            .post("/portal")
            .add_header("authorization", bearer_for(user_id))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], "CUSTOMER_ID_NOT_FOUND");
    }

    #[tokio::test]
    async fn portal_returns_the_provider_url() {
        let user_id = Uuid::new_v4();
        let server = server(
            TestAppStateBuilder::new()
                .with_plan_record(create_test_plan_record(user_id, |_| {}))
                .with_gateway(
                    MockBillingGateway::new().with_portal_url("https://billing.test/portal/1"),
                )
                .build(),
        );

        let response = server
            .post("/portal")
            .add_header("authorization", bearer_for(user_id))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["redirectUrl"], "https://billing.test/portal/1");
    }

    #[tokio::test]
    async fn summary_reports_level_and_degrades_plan_name() {
        let user_id = Uuid::new_v4();
        let prices = test_prices();
        let server = server(
            TestAppStateBuilder::new()
                .with_plan_record(create_test_plan_record(user_id, |r| {
                    r.stripe_price_id = prices.pro_plus_monthly.clone();
                }))
                .build(),
        );

        let response = server
            .get("/subscription")
            .add_header("authorization", bearer_for(user_id))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["level"], "pro_plus");
        // The mock gateway knows no prices, so the lookup degrades.
        assert_eq!(body["planName"], Value::Null);
        assert_eq!(body["oneTime"], false);
    }
}
