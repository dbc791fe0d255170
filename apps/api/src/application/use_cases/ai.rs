//! AI-assisted content generation. The generation capability itself is
//! opaque; this layer owns the entitlement check and the flattening of
//! structured resume data into a single request.

use std::sync::Arc;

use serde::Deserialize;

use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::permissions::can_use_ai_tools,
    application::ports::text_generator::TextGenerator,
    application::use_cases::subscription::{LevelCache, SubscriptionUseCases},
};

const SUMMARY_SYSTEM_MESSAGE: &str = "\
You are an expert resume writer. Write a compelling, professional and concise \
introduction summary from the provided data. Write in third person, focus on \
strengths and achievements relevant to the job title, and keep it to one or \
two sentences. Output only the summary.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceInput {
    pub position: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationInput {
    pub degree: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInput {
    pub job_title: Option<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperienceInput>,
    #[serde(default)]
    pub educations: Vec<EducationInput>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Clone)]
pub struct AiUseCases {
    generator: Arc<dyn TextGenerator>,
    subscriptions: SubscriptionUseCases,
}

impl AiUseCases {
    pub fn new(generator: Arc<dyn TextGenerator>, subscriptions: SubscriptionUseCases) -> Self {
        Self {
            generator,
            subscriptions,
        }
    }

    pub async fn generate_summary(
        &self,
        user_id: Uuid,
        levels: &LevelCache,
        input: &SummaryInput,
    ) -> AppResult<String> {
        let level = levels.level(&self.subscriptions, user_id).await?;
        if !can_use_ai_tools(level) {
            return Err(AppError::UpgradeRequired(
                "Upgrade your subscription to use AI tools.".into(),
            ));
        }

        self.generator
            .generate(SUMMARY_SYSTEM_MESSAGE, &summary_user_message(input))
            .await
    }
}

fn summary_user_message(input: &SummaryInput) -> String {
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".into());

    let mut message = format!(
        "Generate a professional resume summary from this data:\n\nJob title: {}\n",
        or_na(&input.job_title)
    );

    for exp in &input.work_experiences {
        message.push_str(&format!(
            "\nPosition: {} at {} from {} to {}\nDescription: {}\n",
            or_na(&exp.position),
            or_na(&exp.company),
            or_na(&exp.start_date),
            exp.end_date.clone().unwrap_or_else(|| "Present".into()),
            or_na(&exp.description),
        ));
    }

    for edu in &input.educations {
        message.push_str(&format!(
            "\nDegree: {} at {} from {} to {}\n",
            or_na(&edu.degree),
            or_na(&edu.school),
            or_na(&edu.start_date),
            or_na(&edu.end_date),
        ));
    }

    message.push_str(&format!("\nSkills: {}\n", input.skills.join(", ")));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::entities::subscription_level::SubscriptionLevel,
        test_utils::{
            InMemoryPlanRecordRepo, StubTextGenerator, create_test_plan_record, test_prices,
        },
    };

    fn input() -> SummaryInput {
        SummaryInput {
            job_title: Some("Backend Engineer".into()),
            work_experiences: vec![WorkExperienceInput {
                position: Some("Engineer".into()),
                company: Some("Acme".into()),
                start_date: Some("2020-01".into()),
                end_date: None,
                description: Some("Built billing systems.".into()),
            }],
            educations: vec![],
            skills: vec!["Rust".into(), "Postgres".into()],
        }
    }

    fn ai_for(level: SubscriptionLevel) -> (AiUseCases, Uuid) {
        let user_id = Uuid::new_v4();
        let records = match level {
            SubscriptionLevel::Free => InMemoryPlanRecordRepo::new(),
            _ => InMemoryPlanRecordRepo::with_records(vec![create_test_plan_record(
                user_id,
                |r| r.stripe_price_id = test_prices().pro_monthly,
            )]),
        };
        let subscriptions =
            SubscriptionUseCases::new(Arc::new(records), test_prices());
        let generator = Arc::new(StubTextGenerator::new("A seasoned backend engineer."));
        (AiUseCases::new(generator, subscriptions), user_id)
    }

    #[tokio::test]
    async fn free_users_cannot_use_ai_tools() {
        let (ai, user_id) = ai_for(SubscriptionLevel::Free);
        let result = ai
            .generate_summary(user_id, &LevelCache::new(), &input())
            .await;
        assert!(matches!(result, Err(AppError::UpgradeRequired(_))));
    }

    #[tokio::test]
    async fn paid_users_get_generated_text() {
        let (ai, user_id) = ai_for(SubscriptionLevel::Pro);
        let summary = ai
            .generate_summary(user_id, &LevelCache::new(), &input())
            .await
            .unwrap();
        assert_eq!(summary, "A seasoned backend engineer.");
    }

    #[test]
    fn user_message_includes_the_structured_fields() {
        let message = summary_user_message(&input());
        assert!(message.contains("Backend Engineer"));
        assert!(message.contains("Engineer at Acme"));
        assert!(message.contains("to Present"));
        assert!(message.contains("Rust, Postgres"));
    }
}
