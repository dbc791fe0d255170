pub mod ai;
pub mod billing;
pub mod billing_webhooks;
pub mod debug;
pub mod resumes;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router())
        .nest("/resumes", resumes::router())
        .nest("/ai", ai::router())
        .nest("/debug", debug::router())
        .merge(billing_webhooks::router())
}
