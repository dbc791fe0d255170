pub mod ai;
pub mod billing;
pub mod billing_events;
pub mod resumes;
pub mod subscription;
