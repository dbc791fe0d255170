//! Resume record CRUD. Plan-derived limits are enforced here through the
//! request-scoped level cache.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, middleware::AuthUser},
    app_error::AppResult,
    application::use_cases::{resumes::ResumeChanges, subscription::LevelCache},
    domain::entities::resume::Resume,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResumeRequest {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResumeRequest {
    title: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    color_hex: Option<String>,
    border_style: Option<String>,
}

/// POST /api/resumes
async fn create_resume(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateResumeRequest>,
) -> AppResult<(StatusCode, Json<Resume>)> {
    let levels = LevelCache::new();
    let resume = app_state
        .resumes
        .create(user_id, &levels, body.title, body.description)
        .await?;
    Ok((StatusCode::CREATED, Json(resume)))
}

/// GET /api/resumes
async fn list_resumes(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Resume>>> {
    Ok(Json(app_state.resumes.list(user_id).await?))
}

/// GET /api/resumes/{id}
async fn get_resume(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(resume_id): Path<Uuid>,
) -> AppResult<Json<Resume>> {
    Ok(Json(app_state.resumes.get(user_id, resume_id).await?))
}

/// PATCH /api/resumes/{id}
async fn update_resume(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(resume_id): Path<Uuid>,
    Json(body): Json<UpdateResumeRequest>,
) -> AppResult<Json<Resume>> {
    let levels = LevelCache::new();
    let changes = ResumeChanges {
        title: body.title,
        description: body.description,
        summary: body.summary,
        color_hex: body.color_hex,
        border_style: body.border_style,
    };
    let resume = app_state
        .resumes
        .update(user_id, resume_id, &levels, changes)
        .await?;
    Ok(Json(resume))
}

/// DELETE /api/resumes/{id}
async fn delete_resume(
    State(app_state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(resume_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    app_state.resumes.delete(user_id, resume_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_resumes).post(create_resume))
        .route(
            "/{id}",
            patch(update_resume).get(get_resume).delete(delete_resume),
        )
}
