use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::domain::entities::subscription_level::SubscriptionLevel;

/// The three paid-plan price ids configured in the billing provider. The
/// price id on a plan record is the sole discriminator between levels.
#[derive(Debug, Clone)]
pub struct PriceCatalog {
    pub one_time: String,
    pub pro_monthly: String,
    pub pro_plus_monthly: String,
}

impl PriceCatalog {
    /// Unrecognized price ids resolve to `Free` (stale/legacy plan), never an
    /// error.
    pub fn level_for_price(&self, price_id: &str) -> SubscriptionLevel {
        if price_id == self.one_time {
            SubscriptionLevel::OneTime
        } else if price_id == self.pro_monthly {
            SubscriptionLevel::Pro
        } else if price_id == self.pro_plus_monthly {
            SubscriptionLevel::ProPlus
        } else {
            SubscriptionLevel::Free
        }
    }

    pub fn price_for_level(&self, level: SubscriptionLevel) -> Option<&str> {
        match level {
            SubscriptionLevel::Free => None,
            SubscriptionLevel::OneTime => Some(&self.one_time),
            SubscriptionLevel::Pro => Some(&self.pro_monthly),
            SubscriptionLevel::ProPlus => Some(&self.pro_plus_monthly),
        }
    }
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub redis_url: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_per_ip: u64,
    pub rate_limit_per_user: u64,
    pub cors_origin: HeaderValue,
    /// Whether to trust X-Forwarded-For headers. Only enable behind a
    /// reverse proxy; never when the API is directly exposed.
    pub trust_proxy: bool,
    /// Secret the identity provider signs session tokens with.
    pub session_jwt_secret: SecretString,
    /// Public web origin used to build checkout/portal redirect targets.
    pub app_base_url: Url,
    pub stripe_secret_key: SecretString,
    pub stripe_webhook_secret: SecretString,
    pub prices: PriceCatalog,
    pub identity_api_url: Url,
    pub identity_api_key: SecretString,
    pub ai_api_url: Url,
    pub ai_api_key: SecretString,
    pub ai_model: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let redis_url: String = get_env_default("REDIS_URL", "redis://127.0.0.1:6379".to_string());
        let rate_limit_window_secs: u64 = get_env_default("RATE_LIMIT_WINDOW_SECS", 60);
        let rate_limit_per_ip: u64 = get_env_default("RATE_LIMIT_PER_IP", 120);
        let rate_limit_per_user: u64 = get_env_default("RATE_LIMIT_PER_USER", 60);
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        // Default to false for security - must explicitly enable behind a trusted proxy
        let trust_proxy: bool = get_env_default("TRUST_PROXY", false);

        let session_jwt_secret =
            SecretString::new(get_env::<String>("SESSION_JWT_SECRET").into());
        let app_base_url: Url = get_env("APP_BASE_URL");

        let stripe_secret_key = SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());
        let prices = PriceCatalog {
            one_time: get_env("STRIPE_PRICE_ID_ONE_TIME"),
            pro_monthly: get_env("STRIPE_PRICE_ID_PRO_MONTHLY"),
            pro_plus_monthly: get_env("STRIPE_PRICE_ID_PRO_PLUS_MONTHLY"),
        };

        let identity_api_url: Url =
            get_env_default("IDENTITY_API_URL", "https://api.clerk.com".parse().unwrap());
        let identity_api_key = SecretString::new(get_env::<String>("IDENTITY_API_KEY").into());

        let ai_api_url: Url =
            get_env_default("AI_API_URL", "https://api.openai.com/v1".parse().unwrap());
        let ai_api_key = SecretString::new(get_env::<String>("AI_API_KEY").into());
        let ai_model: String = get_env_default("AI_MODEL", "gpt-4.1".to_string());

        Self {
            bind_addr,
            database_url,
            redis_url,
            rate_limit_window_secs,
            rate_limit_per_ip,
            rate_limit_per_user,
            cors_origin,
            trust_proxy,
            session_jwt_secret,
            app_base_url,
            stripe_secret_key,
            stripe_webhook_secret,
            prices,
            identity_api_url,
            identity_api_key,
            ai_api_url,
            ai_api_key,
            ai_model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PriceCatalog {
        PriceCatalog {
            one_time: "price_ot".into(),
            pro_monthly: "price_pro".into(),
            pro_plus_monthly: "price_pp".into(),
        }
    }

    #[test]
    fn price_ids_map_to_their_levels() {
        let catalog = catalog();
        assert_eq!(
            catalog.level_for_price("price_ot"),
            SubscriptionLevel::OneTime
        );
        assert_eq!(catalog.level_for_price("price_pro"), SubscriptionLevel::Pro);
        assert_eq!(
            catalog.level_for_price("price_pp"),
            SubscriptionLevel::ProPlus
        );
        assert_eq!(
            catalog.level_for_price("price_retired"),
            SubscriptionLevel::Free
        );
    }

    #[test]
    fn level_and_price_round_trip_for_paid_levels() {
        let catalog = catalog();
        for level in [
            SubscriptionLevel::OneTime,
            SubscriptionLevel::Pro,
            SubscriptionLevel::ProPlus,
        ] {
            let price = catalog.price_for_level(level).unwrap();
            assert_eq!(catalog.level_for_price(price), level);
        }
        assert!(catalog.price_for_level(SubscriptionLevel::Free).is_none());
    }
}
