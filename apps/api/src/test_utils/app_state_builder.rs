//! Builder producing a minimal `AppState` wired to in-memory mocks for
//! HTTP-level tests.

use std::sync::Arc;

use secrecy::SecretString;
use time::Duration;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::jwt,
    application::use_cases::{
        ai::AiUseCases, billing::BillingUseCases, billing_events::BillingEventUseCases,
        resumes::ResumeUseCases, subscription::SubscriptionUseCases,
    },
    domain::entities::{plan_record::PlanRecord, resume::Resume},
    infra::config::AppConfig,
    test_utils::{
        InMemoryPlanRecordRepo, InMemoryRateLimiter, InMemoryResumeRepo, MockBillingGateway,
        RecordingIdentityDirectory, StubTextGenerator, test_prices,
    },
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

const TEST_SESSION_SECRET: &str = "test-session-secret";

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused-in-tests".to_string(),
        redis_url: "redis://unused-in-tests".to_string(),
        rate_limit_window_secs: 60,
        rate_limit_per_ip: 1_000,
        rate_limit_per_user: 1_000,
        cors_origin: "http://localhost:3000".parse().unwrap(),
        trust_proxy: false,
        session_jwt_secret: SecretString::new(TEST_SESSION_SECRET.into()),
        app_base_url: Url::parse("https://resumio.test/").unwrap(),
        stripe_secret_key: SecretString::new("sk_test_123".into()),
        stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
        prices: test_prices(),
        identity_api_url: Url::parse("https://identity.test/").unwrap(),
        identity_api_key: SecretString::new("idk_test_123".into()),
        ai_api_url: Url::parse("https://ai.test/v1/").unwrap(),
        ai_api_key: SecretString::new("ak_test_123".into()),
        ai_model: "test-model".to_string(),
    }
}

/// `Authorization` header value for a freshly issued session token.
pub fn bearer_for(user_id: Uuid) -> String {
    let secret = SecretString::new(TEST_SESSION_SECRET.into());
    let token = jwt::issue(user_id, &secret, Duration::hours(1)).expect("test token");
    format!("Bearer {token}")
}

/// # Example
///
/// ```ignore
/// let builder = TestAppStateBuilder::new()
///     .with_plan_record(create_test_plan_record(user_id, |_| {}));
/// let records = builder.records();
/// let app_state = builder.build();
/// ```
pub struct TestAppStateBuilder {
    records: Arc<InMemoryPlanRecordRepo>,
    resumes: Arc<InMemoryResumeRepo>,
    gateway: Arc<MockBillingGateway>,
    directory: Arc<RecordingIdentityDirectory>,
    generated_text: String,
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            records: Arc::new(InMemoryPlanRecordRepo::new()),
            resumes: Arc::new(InMemoryResumeRepo::new()),
            gateway: Arc::new(MockBillingGateway::new()),
            directory: Arc::new(RecordingIdentityDirectory::new()),
            generated_text: "generated text".to_string(),
        }
    }

    pub fn with_plan_record(self, record: PlanRecord) -> Self {
        self.records.seed(record);
        self
    }

    pub fn with_resume(self, resume: Resume) -> Self {
        self.resumes.insert(resume);
        self
    }

    pub fn with_gateway(mut self, gateway: MockBillingGateway) -> Self {
        self.gateway = Arc::new(gateway);
        self
    }

    pub fn with_directory(mut self, directory: RecordingIdentityDirectory) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn with_generated_text(mut self, text: &str) -> Self {
        self.generated_text = text.to_string();
        self
    }

    /// Handle onto the plan-record store for post-request assertions.
    pub fn records(&self) -> Arc<InMemoryPlanRecordRepo> {
        self.records.clone()
    }

    pub fn resumes(&self) -> Arc<InMemoryResumeRepo> {
        self.resumes.clone()
    }

    pub fn directory(&self) -> Arc<RecordingIdentityDirectory> {
        self.directory.clone()
    }

    pub fn build(self) -> AppState {
        let config = Arc::new(test_config());
        let prices = config.prices.clone();

        let subscriptions = SubscriptionUseCases::new(self.records.clone(), prices.clone());
        let billing = BillingUseCases::new(
            self.records.clone(),
            self.gateway.clone(),
            prices.clone(),
            config.app_base_url.clone(),
        );
        let billing_events = BillingEventUseCases::new(
            self.records.clone(),
            self.gateway.clone(),
            self.directory.clone(),
            prices,
        );
        let resumes = ResumeUseCases::new(self.resumes.clone(), subscriptions.clone());
        let ai = AiUseCases::new(
            Arc::new(StubTextGenerator::new(&self.generated_text)),
            subscriptions.clone(),
        );

        AppState {
            config,
            billing: Arc::new(billing),
            billing_events: Arc::new(billing_events),
            resumes: Arc::new(resumes),
            ai: Arc::new(ai),
            rate_limiter: Arc::new(InMemoryRateLimiter),
        }
    }
}
