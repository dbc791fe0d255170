//! AI content generation endpoints, available on paid plans.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    app_error::AppResult,
    application::use_cases::{ai::SummaryInput, subscription::LevelCache},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    summary: String,
}

/// POST /api/ai/summary
async fn generate_summary(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<SummaryInput>,
) -> AppResult<Json<SummaryResponse>> {
    let levels = LevelCache::new();
    let summary = app_state
        .ai
        .generate_summary(user_id, &levels, &body)
        .await?;
    Ok(Json(SummaryResponse { summary }))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/summary", post(generate_summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use crate::test_utils::{
        TestAppStateBuilder, bearer_for, create_test_plan_record, test_prices,
    };

    fn server(app_state: AppState) -> TestServer {
        TestServer::new(Router::new().nest("/ai", router()).with_state(app_state)).unwrap()
    }

    fn request_body() -> Value {
        json!({
            "jobTitle": "Backend Engineer",
            "workExperiences": [],
            "educations": [],
            "skills": ["Rust"],
        })
    }

    #[tokio::test]
    async fn free_users_get_an_upgrade_prompt() {
        let server = server(TestAppStateBuilder::new().build());

        let response = server
            .post("/ai/summary")
            .add_header("authorization", bearer_for(Uuid::new_v4()))
            .json(&request_body())
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["code"], "UPGRADE_REQUIRED");
    }

    #[tokio::test]
    async fn paid_users_receive_the_generated_summary() {
        let user_id = Uuid::new_v4();
        let server = server(
            TestAppStateBuilder::new()
                .with_plan_record(create_test_plan_record(user_id, |r| {
                    r.stripe_price_id = test_prices().one_time;
                }))
                .with_generated_text("A seasoned backend engineer.")
                .build(),
        );

        let response = server
            .post("/ai/summary")
            .add_header("authorization", bearer_for(user_id))
            .json(&request_body())
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["summary"], "A seasoned backend engineer.");
    }
}
