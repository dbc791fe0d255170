//! Resume record management. Creation is bounded by the caller's plan, and
//! design customizations are a Pro Plus feature.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::permissions::{can_create_resume, can_use_customizations},
    application::use_cases::subscription::{LevelCache, SubscriptionUseCases},
    domain::entities::resume::Resume,
};

// ============================================================================
// Repository Trait
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewResume {
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ResumeChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub color_hex: Option<String>,
    pub border_style: Option<String>,
}

#[async_trait]
pub trait ResumeRepo: Send + Sync {
    async fn count_by_user(&self, user_id: Uuid) -> AppResult<i64>;
    async fn create(&self, input: &NewResume) -> AppResult<Resume>;
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Resume>>;
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Resume>>;
    async fn update(&self, id: Uuid, changes: &ResumeChanges) -> AppResult<Resume>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct ResumeUseCases {
    resumes: Arc<dyn ResumeRepo>,
    subscriptions: SubscriptionUseCases,
}

impl ResumeUseCases {
    pub fn new(resumes: Arc<dyn ResumeRepo>, subscriptions: SubscriptionUseCases) -> Self {
        Self {
            resumes,
            subscriptions,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        levels: &LevelCache,
        title: Option<String>,
        description: Option<String>,
    ) -> AppResult<Resume> {
        let level = levels.level(&self.subscriptions, user_id).await?;
        let current_count = self.resumes.count_by_user(user_id).await?;
        if !can_create_resume(level, current_count) {
            return Err(AppError::UpgradeRequired(
                "Resume limit reached for your plan. Upgrade to create more resumes.".into(),
            ));
        }

        self.resumes
            .create(&NewResume {
                user_id,
                title,
                description,
            })
            .await
    }

    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Resume>> {
        self.resumes.list_by_user(user_id).await
    }

    pub async fn get(&self, user_id: Uuid, resume_id: Uuid) -> AppResult<Resume> {
        self.owned_resume(user_id, resume_id).await
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        resume_id: Uuid,
        levels: &LevelCache,
        changes: ResumeChanges,
    ) -> AppResult<Resume> {
        let resume = self.owned_resume(user_id, resume_id).await?;

        let wants_customization = changes
            .color_hex
            .as_deref()
            .is_some_and(|c| c != resume.color_hex)
            || changes
                .border_style
                .as_deref()
                .is_some_and(|b| b != resume.border_style);
        if wants_customization {
            let level = levels.level(&self.subscriptions, user_id).await?;
            if !can_use_customizations(level) {
                return Err(AppError::UpgradeRequired(
                    "Design customizations are a Pro Plus feature.".into(),
                ));
            }
        }

        self.resumes.update(resume_id, &changes).await
    }

    pub async fn delete(&self, user_id: Uuid, resume_id: Uuid) -> AppResult<()> {
        self.owned_resume(user_id, resume_id).await?;
        self.resumes.delete(resume_id).await
    }

    /// Other users' resumes are indistinguishable from absent ones.
    async fn owned_resume(&self, user_id: Uuid, resume_id: Uuid) -> AppResult<Resume> {
        let resume = self
            .resumes
            .get_by_id(resume_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if resume.user_id != user_id {
            return Err(AppError::NotFound);
        }
        Ok(resume)
    }
}
