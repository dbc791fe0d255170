use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Too many requests. Please slow down.")]
    RateLimited,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    /// Feature gating: the caller's plan does not include the feature.
    /// Surfaced as an upgrade prompt, not a generic failure.
    #[error("{0}")]
    UpgradeRequired(String),

    #[error("No active subscription found. Please subscribe first.")]
    NoActiveSubscription,

    #[error("Billing customer ID not found. Please contact support.")]
    CustomerIdNotFound,

    #[error("Failed to create checkout session")]
    CheckoutCreationFailed,

    #[error("Failed to create customer portal session")]
    PortalCreationFailed,

    /// A billing event lacked required metadata. Fatal for the single event;
    /// the provider's retry policy governs recovery.
    #[error("Event metadata missing: {0}")]
    MissingEventMetadata(String),

    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    DatabaseError,
    Unauthorized,
    RateLimited,
    InvalidInput,
    NotFound,
    UpgradeRequired,
    NoActiveSubscription,
    CustomerIdNotFound,
    CheckoutCreationFailed,
    PortalCreationFailed,
    MissingEventMetadata,
    SignatureVerification,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::UpgradeRequired => "UPGRADE_REQUIRED",
            ErrorCode::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            ErrorCode::CustomerIdNotFound => "CUSTOMER_ID_NOT_FOUND",
            ErrorCode::CheckoutCreationFailed => "CHECKOUT_CREATION_FAILED",
            ErrorCode::PortalCreationFailed => "PORTAL_CREATION_FAILED",
            ErrorCode::MissingEventMetadata => "MISSING_EVENT_METADATA",
            ErrorCode::SignatureVerification => "SIGNATURE_VERIFICATION",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
