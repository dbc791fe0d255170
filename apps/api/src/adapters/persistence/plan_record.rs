use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{PlanRecordRepo, PlanRecordUpsert},
    domain::entities::plan_record::PlanRecord,
};

fn row_to_record(row: &sqlx::postgres::PgRow) -> PlanRecord {
    PlanRecord {
        user_id: row.get("user_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_price_id: row.get("stripe_price_id"),
        current_period_end: row.get("current_period_end"),
        cancel_at_period_end: row.get("cancel_at_period_end"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    user_id, stripe_subscription_id, stripe_customer_id, stripe_price_id,
    current_period_end, cancel_at_period_end, created_at, updated_at
"#;

#[async_trait]
impl PlanRecordRepo for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<PlanRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM plan_records WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn upsert(&self, input: &PlanRecordUpsert) -> AppResult<PlanRecord> {
        // The unique key on user_id makes this the single-record atomic
        // write the reconciler's idempotency rests on.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO plan_records (
                user_id, stripe_subscription_id, stripe_customer_id,
                stripe_price_id, current_period_end, cancel_at_period_end,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, now(), now())
            ON CONFLICT (user_id) DO UPDATE SET
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_price_id = EXCLUDED.stripe_price_id,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = EXCLUDED.cancel_at_period_end,
                updated_at = now()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.user_id)
        .bind(&input.stripe_subscription_id)
        .bind(&input.stripe_customer_id)
        .bind(&input.stripe_price_id)
        .bind(input.current_period_end)
        .bind(input.cancel_at_period_end)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_record(&row))
    }

    async fn delete_by_user(&self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM plan_records WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_customer(&self, customer_id: &str) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM plan_records WHERE stripe_customer_id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
