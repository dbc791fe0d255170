//! In-memory mock implementations for the repository traits and external
//! ports.

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{
        billing_gateway::{
            BillingGateway, CheckoutSessionRequest, CreatedSession, ProviderPrice,
            ProviderSubscription,
        },
        identity_directory::IdentityDirectory,
        text_generator::TextGenerator,
    },
    application::use_cases::resumes::{NewResume, ResumeChanges, ResumeRepo},
    application::use_cases::subscription::{PlanRecordRepo, PlanRecordUpsert},
    domain::entities::plan_record::PlanRecord,
    domain::entities::resume::{DEFAULT_BORDER_STYLE, DEFAULT_COLOR_HEX, Resume},
    infra::RateLimiterTrait,
};

// ============================================================================
// InMemoryPlanRecordRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRecordRepo {
    records: Mutex<HashMap<Uuid, PlanRecord>>,
    fetches: AtomicUsize,
}

impl InMemoryPlanRecordRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<PlanRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.user_id, r)).collect();
        Self {
            records: Mutex::new(map),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn seed(&self, record: PlanRecord) {
        self.records.lock().unwrap().insert(record.user_id, record);
    }

    pub fn get(&self, user_id: Uuid) -> Option<PlanRecord> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get_by_user` calls, for cache assertions.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanRecordRepo for InMemoryPlanRecordRepo {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<PlanRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert(&self, input: &PlanRecordUpsert) -> AppResult<PlanRecord> {
        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let created_at = records
            .get(&input.user_id)
            .and_then(|r| r.created_at)
            .or(Some(now));
        let record = PlanRecord {
            user_id: input.user_id,
            stripe_subscription_id: input.stripe_subscription_id.clone(),
            stripe_customer_id: input.stripe_customer_id.clone(),
            stripe_price_id: input.stripe_price_id.clone(),
            current_period_end: input.current_period_end,
            cancel_at_period_end: input.cancel_at_period_end,
            created_at,
            updated_at: Some(now),
        };
        records.insert(input.user_id, record.clone());
        Ok(record)
    }

    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.records.lock().unwrap().remove(&user_id).is_some())
    }

    async fn delete_by_customer(&self, customer_id: &str) -> AppResult<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.stripe_customer_id != customer_id);
        Ok((before - records.len()) as u64)
    }
}

// ============================================================================
// InMemoryResumeRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryResumeRepo {
    resumes: Mutex<HashMap<Uuid, Resume>>,
}

impl InMemoryResumeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, resume: Resume) -> Resume {
        self.resumes
            .lock()
            .unwrap()
            .insert(resume.id, resume.clone());
        resume
    }

    pub fn count(&self, user_id: Uuid) -> usize {
        self.resumes
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl ResumeRepo for InMemoryResumeRepo {
    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(self.count(user_id) as i64)
    }

    async fn create(&self, input: &NewResume) -> AppResult<Resume> {
        let now = Utc::now();
        let resume = Resume {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            title: input.title.clone(),
            description: input.description.clone(),
            summary: None,
            color_hex: DEFAULT_COLOR_HEX.to_string(),
            border_style: DEFAULT_BORDER_STYLE.to_string(),
            created_at: now,
            updated_at: now,
        };
        Ok(self.insert(resume))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Resume>> {
        let mut resumes: Vec<Resume> = self
            .resumes
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        resumes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(resumes)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Resume>> {
        Ok(self.resumes.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, id: Uuid, changes: &ResumeChanges) -> AppResult<Resume> {
        let mut resumes = self.resumes.lock().unwrap();
        let resume = resumes.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(title) = &changes.title {
            resume.title = Some(title.clone());
        }
        if let Some(description) = &changes.description {
            resume.description = Some(description.clone());
        }
        if let Some(summary) = &changes.summary {
            resume.summary = Some(summary.clone());
        }
        if let Some(color_hex) = &changes.color_hex {
            resume.color_hex = color_hex.clone();
        }
        if let Some(border_style) = &changes.border_style {
            resume.border_style = border_style.clone();
        }
        resume.updated_at = Utc::now();
        Ok(resume.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.resumes.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// MockBillingGateway
// ============================================================================

/// Scriptable billing-provider stand-in. Configure the objects it should
/// know about with the `with_*` builders; calls against unknown ids fail the
/// way the real provider's API would.
#[derive(Default)]
pub struct MockBillingGateway {
    subscriptions: Mutex<HashMap<String, ProviderSubscription>>,
    line_item_prices: Mutex<HashMap<String, String>>,
    prices: Mutex<HashMap<String, ProviderPrice>>,
    checkout_url: Mutex<Option<String>>,
    portal_url: Mutex<Option<String>>,
    checkout_requests: Mutex<Vec<CheckoutSessionRequest>>,
}

impl MockBillingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, subscription: ProviderSubscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
        self
    }

    pub fn with_line_item_price(self, session_id: &str, price_id: &str) -> Self {
        self.line_item_prices
            .lock()
            .unwrap()
            .insert(session_id.to_string(), price_id.to_string());
        self
    }

    pub fn with_price(self, price: ProviderPrice) -> Self {
        self.prices.lock().unwrap().insert(price.id.clone(), price);
        self
    }

    pub fn with_checkout_url(self, url: &str) -> Self {
        *self.checkout_url.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn with_portal_url(self, url: &str) -> Self {
        *self.portal_url.lock().unwrap() = Some(url.to_string());
        self
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutSessionRequest> {
        self.checkout_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillingGateway for MockBillingGateway {
    async fn fetch_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| {
                AppError::InvalidInput(format!("no such subscription: {subscription_id}"))
            })
    }

    async fn first_line_item_price(&self, checkout_session_id: &str) -> AppResult<Option<String>> {
        Ok(self
            .line_item_prices
            .lock()
            .unwrap()
            .get(checkout_session_id)
            .cloned())
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> AppResult<CreatedSession> {
        self.checkout_requests.lock().unwrap().push(request.clone());
        Ok(CreatedSession {
            id: "cs_test_1".to_string(),
            url: self.checkout_url.lock().unwrap().clone(),
        })
    }

    async fn create_portal_session(
        &self,
        _customer_id: &str,
        _return_url: &str,
    ) -> AppResult<CreatedSession> {
        Ok(CreatedSession {
            id: "bps_test_1".to_string(),
            url: self.portal_url.lock().unwrap().clone(),
        })
    }

    async fn fetch_price(&self, price_id: &str) -> AppResult<ProviderPrice> {
        self.prices
            .lock()
            .unwrap()
            .get(price_id)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("no such price: {price_id}")))
    }
}

// ============================================================================
// RecordingIdentityDirectory
// ============================================================================

#[derive(Default)]
pub struct RecordingIdentityDirectory {
    synced: Mutex<Vec<(Uuid, String)>>,
    fail: bool,
}

impl RecordingIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A directory whose writes always fail, for best-effort-path tests.
    pub fn failing() -> Self {
        Self {
            synced: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn synced(&self) -> Vec<(Uuid, String)> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityDirectory for RecordingIdentityDirectory {
    async fn record_billing_customer(&self, user_id: Uuid, customer_id: &str) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("identity provider unavailable".into()));
        }
        self.synced
            .lock()
            .unwrap()
            .push((user_id, customer_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// StubTextGenerator
// ============================================================================

pub struct StubTextGenerator {
    response: String,
}

impl StubTextGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for StubTextGenerator {
    async fn generate(&self, _system: &str, _user: &str) -> AppResult<String> {
        Ok(self.response.clone())
    }
}

// ============================================================================
// InMemoryRateLimiter
// ============================================================================

/// Rate limiter that always allows; tests are not about request budgets.
#[derive(Default)]
pub struct InMemoryRateLimiter;

#[async_trait]
impl RateLimiterTrait for InMemoryRateLimiter {
    async fn check(&self, _ip: &str, _user: Option<&str>) -> AppResult<()> {
        Ok(())
    }
}
