//! In-memory mocks, factories and helpers for unit and HTTP-level tests.

mod app_state_builder;
mod billing_mocks;
mod factories;

pub use app_state_builder::{TEST_WEBHOOK_SECRET, TestAppStateBuilder, bearer_for, test_config};
pub use billing_mocks::{
    InMemoryPlanRecordRepo, InMemoryRateLimiter, InMemoryResumeRepo, MockBillingGateway,
    RecordingIdentityDirectory, StubTextGenerator,
};
pub use factories::{create_test_plan_record, create_test_resume, test_prices};

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Produce a provider-style `t=...,v1=...` signature header for a payload.
pub fn sign_webhook_payload(secret: &str, timestamp: i64, body: &str) -> String {
    let signed_content = format!("{timestamp}.{body}");
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_content.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}
