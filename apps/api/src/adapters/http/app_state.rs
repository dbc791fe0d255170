use std::sync::Arc;

use crate::{
    application::use_cases::{
        ai::AiUseCases, billing::BillingUseCases, billing_events::BillingEventUseCases,
        resumes::ResumeUseCases,
    },
    infra::{RateLimiterTrait, config::AppConfig},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing: Arc<BillingUseCases>,
    pub billing_events: Arc<BillingEventUseCases>,
    pub resumes: Arc<ResumeUseCases>,
    pub ai: Arc<AiUseCases>,
    pub rate_limiter: Arc<dyn RateLimiterTrait>,
}
