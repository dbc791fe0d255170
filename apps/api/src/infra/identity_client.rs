use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::identity_directory::IdentityDirectory,
};

/// Identity-provider user directory client. Users and sessions live entirely
/// in the provider; the only write this service performs is stamping the
/// billing customer id into a user's private metadata.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
}

impl IdentityClient {
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl IdentityDirectory for IdentityClient {
    async fn record_billing_customer(&self, user_id: Uuid, customer_id: &str) -> AppResult<()> {
        let url = self
            .base_url
            .join(&format!("v1/users/{user_id}/metadata"))
            .map_err(|e| AppError::Internal(format!("invalid identity API url: {e}")))?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&serde_json::json!({
                "private_metadata": { "stripeCustomerId": customer_id }
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("identity provider request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "identity provider API error");
            return Err(AppError::Internal(format!(
                "identity provider API error: {status}"
            )));
        }
        Ok(())
    }
}
