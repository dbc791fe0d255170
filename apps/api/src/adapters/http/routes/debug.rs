//! Manual subscription management for debugging billing flows. Upserts plan
//! records exactly as the corresponding webhook event would, for the caller's
//! own account only.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    domain::entities::subscription_level::SubscriptionLevel,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualSubscriptionRequest {
    user_id: Uuid,
    #[serde(default = "default_plan_type")]
    plan_type: SubscriptionLevel,
}

fn default_plan_type() -> SubscriptionLevel {
    SubscriptionLevel::OneTime
}

/// POST /api/debug/manual-subscription
async fn manual_subscription(
    State(app_state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<ManualSubscriptionRequest>,
) -> Response {
    if caller != body.user_id {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    match app_state
        .billing
        .manual_grant(body.user_id, body.plan_type)
        .await
    {
        Ok(subscription) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "subscription": subscription,
                "message": format!(
                    "Manual {} subscription created successfully",
                    body.plan_type.as_str()
                ),
            })),
        )
            .into_response(),
        Err(error) => {
            error!(%error, user_id = %body.user_id, "manual subscription creation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": error.to_string() })),
            )
                .into_response()
        }
    }
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/manual-subscription", post(manual_subscription))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use chrono::Utc;
    use serde_json::Value;

    use crate::test_utils::{TestAppStateBuilder, bearer_for, test_prices};

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(Router::new().merge(router()).with_state(app_state)).unwrap()
    }

    #[tokio::test]
    async fn rejects_unauthenticated_callers() {
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/manual-subscription")
            .json(&json!({ "userId": Uuid::new_v4(), "planType": "pro" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn rejects_a_caller_granting_someone_else() {
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/manual-subscription")
            .add_header("authorization", bearer_for(Uuid::new_v4()))
            .json(&json!({ "userId": Uuid::new_v4(), "planType": "pro" }))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn grants_one_time_access_for_fifteen_days() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new();
        let records = builder.records();
        let server = server(builder.build());

        let response = server
            .post("/manual-subscription")
            .add_header("authorization", bearer_for(user_id))
            .json(&json!({ "userId": user_id, "planType": "one_time" }))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(
            body["subscription"]["stripePriceId"],
            test_prices().one_time
        );

        let record = records.get(user_id).unwrap();
        let days = (record.current_period_end - Utc::now()).num_days();
        assert!((14..=15).contains(&days));
    }

    #[tokio::test]
    async fn grants_pro_access_for_one_month() {
        let user_id = Uuid::new_v4();
        let builder = TestAppStateBuilder::new();
        let records = builder.records();
        let server = server(builder.build());

        let response = server
            .post("/manual-subscription")
            .add_header("authorization", bearer_for(user_id))
            .json(&json!({ "userId": user_id, "planType": "pro_plus" }))
            .await;

        response.assert_status(StatusCode::OK);
        let record = records.get(user_id).unwrap();
        let days = (record.current_period_end - Utc::now()).num_days();
        assert!((27..=31).contains(&days));
        assert_eq!(record.stripe_price_id, test_prices().pro_plus_monthly);
    }

    #[tokio::test]
    async fn the_free_plan_type_is_an_error() {
        let user_id = Uuid::new_v4();
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/manual-subscription")
            .add_header("authorization", bearer_for(user_id))
            .json(&json!({ "userId": user_id, "planType": "free" }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }
}
