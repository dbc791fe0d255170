use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::resumes::{NewResume, ResumeChanges, ResumeRepo},
    domain::entities::resume::{DEFAULT_BORDER_STYLE, DEFAULT_COLOR_HEX, Resume},
};

fn row_to_resume(row: &sqlx::postgres::PgRow) -> Resume {
    Resume {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        summary: row.get("summary"),
        color_hex: row.get("color_hex"),
        border_style: row.get("border_style"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, title, description, summary, color_hex, border_style,
    created_at, updated_at
"#;

#[async_trait]
impl ResumeRepo for PostgresPersistence {
    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM resumes WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.get("count"))
    }

    async fn create(&self, input: &NewResume) -> AppResult<Resume> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO resumes (
                id, user_id, title, description, summary, color_hex,
                border_style, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, NULL, $5, $6, now(), now())
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(DEFAULT_COLOR_HEX)
        .bind(DEFAULT_BORDER_STYLE)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_resume(&row))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Resume>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_resume).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Resume>> {
        let row = sqlx::query(&format!("SELECT {} FROM resumes WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_resume))
    }

    async fn update(&self, id: Uuid, changes: &ResumeChanges) -> AppResult<Resume> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE resumes SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                summary = COALESCE($4, summary),
                color_hex = COALESCE($5, color_hex),
                border_style = COALESCE($6, border_style),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.summary)
        .bind(&changes.color_hex)
        .bind(&changes.border_style)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;
        Ok(row_to_resume(&row))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
