pub mod plan_record;
pub mod resume;
pub mod subscription_level;
