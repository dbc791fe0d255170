//! Test data factories. Each function creates a complete, valid object with
//! sensible defaults; use the closure parameter to override fields.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    domain::entities::plan_record::PlanRecord,
    domain::entities::resume::{DEFAULT_BORDER_STYLE, DEFAULT_COLOR_HEX, Resume},
    infra::config::PriceCatalog,
};

pub fn test_prices() -> PriceCatalog {
    PriceCatalog {
        one_time: "price_one_time_test".into(),
        pro_monthly: "price_pro_monthly_test".into(),
        pro_plus_monthly: "price_pro_plus_test".into(),
    }
}

/// A live pro-plan record expiring in 30 days.
pub fn create_test_plan_record(
    user_id: Uuid,
    overrides: impl FnOnce(&mut PlanRecord),
) -> PlanRecord {
    let now = Utc::now();
    let mut record = PlanRecord {
        user_id,
        stripe_subscription_id: "sub_123".to_string(),
        stripe_customer_id: "cus_123".to_string(),
        stripe_price_id: test_prices().pro_monthly,
        current_period_end: now + Duration::days(30),
        cancel_at_period_end: false,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut record);
    record
}

pub fn create_test_resume(user_id: Uuid, overrides: impl FnOnce(&mut Resume)) -> Resume {
    let now = Utc::now();
    let mut resume = Resume {
        id: Uuid::new_v4(),
        user_id,
        title: Some("Untitled resume".to_string()),
        description: None,
        summary: None,
        color_hex: DEFAULT_COLOR_HEX.to_string(),
        border_style: DEFAULT_BORDER_STYLE.to_string(),
        created_at: now,
        updated_at: now,
    };
    overrides(&mut resume);
    resume
}
