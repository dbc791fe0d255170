use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::ports::{
        billing_gateway::BillingGateway, identity_directory::IdentityDirectory,
        text_generator::TextGenerator,
    },
    application::use_cases::{
        ai::AiUseCases,
        billing::BillingUseCases,
        billing_events::BillingEventUseCases,
        resumes::{ResumeRepo, ResumeUseCases},
        subscription::{PlanRecordRepo, SubscriptionUseCases},
    },
    infra::{
        RateLimiterTrait, ai_client::OpenAiClient, config::AppConfig,
        identity_client::IdentityClient, postgres_persistence, rate_limit::RedisRateLimiter,
        stripe_client::StripeClient,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres = Arc::new(postgres_persistence(&config.database_url).await?);

    let rate_limiter: Arc<dyn RateLimiterTrait> = Arc::new(
        RedisRateLimiter::new(
            &config.redis_url,
            config.rate_limit_window_secs,
            config.rate_limit_per_ip,
            config.rate_limit_per_user,
        )
        .await?,
    );

    let gateway: Arc<dyn BillingGateway> =
        Arc::new(StripeClient::new(config.stripe_secret_key.clone()));
    let directory: Arc<dyn IdentityDirectory> = Arc::new(IdentityClient::new(
        config.identity_api_url.clone(),
        config.identity_api_key.clone(),
    ));
    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiClient::new(
        config.ai_api_url.clone(),
        config.ai_api_key.clone(),
        config.ai_model.clone(),
    ));

    let plan_records = postgres.clone() as Arc<dyn PlanRecordRepo>;
    let resume_repo = postgres.clone() as Arc<dyn ResumeRepo>;

    let subscriptions = SubscriptionUseCases::new(plan_records.clone(), config.prices.clone());
    let billing = BillingUseCases::new(
        plan_records.clone(),
        gateway.clone(),
        config.prices.clone(),
        config.app_base_url.clone(),
    );
    let billing_events = BillingEventUseCases::new(
        plan_records.clone(),
        gateway.clone(),
        directory.clone(),
        config.prices.clone(),
    );
    let resumes = ResumeUseCases::new(resume_repo, subscriptions.clone());
    let ai = AiUseCases::new(generator, subscriptions.clone());

    Ok(AppState {
        config: Arc::new(config),
        billing: Arc::new(billing),
        billing_events: Arc::new(billing_events),
        resumes: Arc::new(resumes),
        ai: Arc::new(ai),
        rate_limiter,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "resumio_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
