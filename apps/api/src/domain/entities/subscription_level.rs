use serde::{Deserialize, Serialize};

/// The four entitlement tiers a user can be on. `Free` is the default for
/// users with no plan record and for expired or unrecognized grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionLevel {
    Free,
    OneTime,
    Pro,
    ProPlus,
}

impl SubscriptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionLevel::Free => "free",
            SubscriptionLevel::OneTime => "one_time",
            SubscriptionLevel::Pro => "pro",
            SubscriptionLevel::ProPlus => "pro_plus",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, SubscriptionLevel::Free)
    }
}

impl std::fmt::Display for SubscriptionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
