use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{plan_record::PlanRecord, subscription_level::SubscriptionLevel},
    infra::config::PriceCatalog,
};

// ============================================================================
// Repository Trait
// ============================================================================

/// Field set written by every reconciler or manual-grant upsert.
#[derive(Debug, Clone)]
pub struct PlanRecordUpsert {
    pub user_id: Uuid,
    pub stripe_subscription_id: String,
    pub stripe_customer_id: String,
    pub stripe_price_id: String,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

#[async_trait]
pub trait PlanRecordRepo: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<PlanRecord>>;

    /// Create-or-update keyed by user id, atomic at single-record
    /// granularity. Concurrent writers race; last write wins.
    async fn upsert(&self, input: &PlanRecordUpsert) -> AppResult<PlanRecord>;

    /// Returns whether a record existed. Deleting an absent record is
    /// success, not an error.
    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<bool>;

    /// Delete every record carrying this customer id; returns the count.
    async fn delete_by_customer(&self, customer_id: &str) -> AppResult<u64>;
}

// ============================================================================
// Plan Resolution
// ============================================================================

/// Total mapping from a plan record (or absence of one) to a level.
///
/// No record and expired records are `free`; an unrecognized price id on a
/// live record is a stale/legacy plan and also resolves to `free`.
pub fn classify(
    record: Option<&PlanRecord>,
    now: DateTime<Utc>,
    prices: &PriceCatalog,
) -> SubscriptionLevel {
    let Some(record) = record else {
        return SubscriptionLevel::Free;
    };
    if now > record.current_period_end {
        return SubscriptionLevel::Free;
    }
    prices.level_for_price(&record.stripe_price_id)
}

#[derive(Clone)]
pub struct SubscriptionUseCases {
    records: Arc<dyn PlanRecordRepo>,
    prices: PriceCatalog,
}

impl SubscriptionUseCases {
    pub fn new(records: Arc<dyn PlanRecordRepo>, prices: PriceCatalog) -> Self {
        Self { records, prices }
    }

    pub async fn resolve_level(&self, user_id: Uuid) -> AppResult<SubscriptionLevel> {
        let record = self.records.get_by_user(user_id).await?;
        Ok(classify(record.as_ref(), Utc::now(), &self.prices))
    }
}

// ============================================================================
// Request-Scoped Level Cache
// ============================================================================

/// Memoizes resolved levels for the lifetime of one request. Handlers build
/// one per request and pass it down; it must never outlive the request since
/// expiry is time-based and records change between requests.
#[derive(Default)]
pub struct LevelCache {
    resolved: Mutex<HashMap<Uuid, SubscriptionLevel>>,
}

impl LevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn level(
        &self,
        subscriptions: &SubscriptionUseCases,
        user_id: Uuid,
    ) -> AppResult<SubscriptionLevel> {
        if let Some(level) = self.resolved.lock().await.get(&user_id) {
            return Ok(*level);
        }
        let level = subscriptions.resolve_level(user_id).await?;
        self.resolved.lock().await.insert(user_id, level);
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryPlanRecordRepo, create_test_plan_record, test_prices};
    use chrono::Duration;

    #[test]
    fn no_record_resolves_to_free() {
        assert_eq!(
            classify(None, Utc::now(), &test_prices()),
            SubscriptionLevel::Free
        );
    }

    #[test]
    fn expired_record_resolves_to_free_regardless_of_price() {
        let prices = test_prices();
        for price in [
            prices.one_time.clone(),
            prices.pro_monthly.clone(),
            prices.pro_plus_monthly.clone(),
        ] {
            let record = create_test_plan_record(Uuid::new_v4(), |r| {
                r.stripe_price_id = price.clone();
                r.current_period_end = Utc::now() - Duration::hours(1);
            });
            assert_eq!(
                classify(Some(&record), Utc::now(), &prices),
                SubscriptionLevel::Free
            );
        }
    }

    #[test]
    fn live_record_resolves_by_price_id() {
        let prices = test_prices();
        let cases = [
            (prices.one_time.clone(), SubscriptionLevel::OneTime),
            (prices.pro_monthly.clone(), SubscriptionLevel::Pro),
            (prices.pro_plus_monthly.clone(), SubscriptionLevel::ProPlus),
            ("price_from_a_retired_plan".to_string(), SubscriptionLevel::Free),
        ];
        for (price, expected) in cases {
            let record = create_test_plan_record(Uuid::new_v4(), |r| {
                r.stripe_price_id = price;
                r.current_period_end = Utc::now() + Duration::days(10);
            });
            assert_eq!(classify(Some(&record), Utc::now(), &prices), expected);
        }
    }

    #[tokio::test]
    async fn resolve_level_reads_the_store() {
        let user_id = Uuid::new_v4();
        let repo = Arc::new(InMemoryPlanRecordRepo::with_records(vec![
            create_test_plan_record(user_id, |r| {
                r.stripe_price_id = test_prices().pro_monthly;
            }),
        ]));
        let subscriptions = SubscriptionUseCases::new(repo, test_prices());

        assert_eq!(
            subscriptions.resolve_level(user_id).await.unwrap(),
            SubscriptionLevel::Pro
        );
        assert_eq!(
            subscriptions.resolve_level(Uuid::new_v4()).await.unwrap(),
            SubscriptionLevel::Free
        );
    }

    #[tokio::test]
    async fn level_cache_resolves_each_user_once() {
        let user_id = Uuid::new_v4();
        let repo = Arc::new(InMemoryPlanRecordRepo::with_records(vec![
            create_test_plan_record(user_id, |r| {
                r.stripe_price_id = test_prices().pro_plus_monthly;
            }),
        ]));
        let subscriptions = SubscriptionUseCases::new(repo.clone(), test_prices());
        let cache = LevelCache::new();

        for _ in 0..3 {
            assert_eq!(
                cache.level(&subscriptions, user_id).await.unwrap(),
                SubscriptionLevel::ProPlus
            );
        }
        assert_eq!(repo.fetch_count(), 1);
    }
}
