//! Pure feature-access decisions derived from a subscription level.
//!
//! These are total functions with no side effects; every gated operation in
//! the service goes through one of them.

use crate::domain::entities::subscription_level::SubscriptionLevel;

/// Resume count ceiling per level. `None` means unbounded.
fn max_resumes(level: SubscriptionLevel) -> Option<i64> {
    match level {
        SubscriptionLevel::Free => Some(1),
        SubscriptionLevel::OneTime => Some(1),
        SubscriptionLevel::Pro => Some(3),
        SubscriptionLevel::ProPlus => None,
    }
}

pub fn can_create_resume(level: SubscriptionLevel, current_count: i64) -> bool {
    match max_resumes(level) {
        Some(max) => current_count < max,
        None => true,
    }
}

pub fn can_use_ai_tools(level: SubscriptionLevel) -> bool {
    level != SubscriptionLevel::Free
}

pub fn can_use_customizations(level: SubscriptionLevel) -> bool {
    level == SubscriptionLevel::ProPlus
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionLevel::*;

    #[test]
    fn resume_limits_per_level() {
        assert!(can_create_resume(Free, 0));
        assert!(!can_create_resume(Free, 1));
        assert!(can_create_resume(OneTime, 0));
        assert!(!can_create_resume(OneTime, 1));
        assert!(can_create_resume(Pro, 2));
        assert!(!can_create_resume(Pro, 3));
        for count in [0, 1, 10, 1_000_000] {
            assert!(can_create_resume(ProPlus, count));
        }
    }

    #[test]
    fn ai_tools_require_any_paid_level() {
        assert!(!can_use_ai_tools(Free));
        assert!(can_use_ai_tools(OneTime));
        assert!(can_use_ai_tools(Pro));
        assert!(can_use_ai_tools(ProPlus));
    }

    #[test]
    fn customizations_are_pro_plus_only() {
        assert!(!can_use_customizations(Free));
        assert!(!can_use_customizations(OneTime));
        assert!(!can_use_customizations(Pro));
        assert!(can_use_customizations(ProPlus));
    }
}
