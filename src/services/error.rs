use thiserror::Error;

/// Business-rule and dependency failures surfaced by the onboarding
/// services.
///
/// Everything except `Dependency` is an expected outcome the caller maps
/// to a user-facing message; `Expired` and `AttemptsExhausted` mean
/// "request a new code", `InvalidState` means the workflow has already
/// progressed and the caller should refresh.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("operation '{operation}' not allowed in status '{status}'")]
    InvalidState {
        operation: &'static str,
        status: String,
    },

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired")]
    Expired,

    #[error("maximum verification attempts exceeded")]
    AttemptsExhausted,

    #[error("not authorized: {0}")]
    Unauthorized(&'static str),

    #[error("already processed: {0}")]
    AlreadyProcessed(&'static str),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("dependency failure: {0}")]
    Dependency(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(errors.to_string())
    }
}
