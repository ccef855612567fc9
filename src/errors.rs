use http::StatusCode;
use sea_orm::error::DbErr;
use serde::Serialize;

/// Error type returned by every engine operation.
///
/// Domain failures (`NotFound`, `PreconditionViolation`, `CapacityViolation`,
/// `DuplicateState`) abort the surrounding unit of work and are meant to be
/// shown to operators as validation failures. None of them are retried.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PreconditionViolation(String),

    #[error("{0}")]
    CapacityViolation(String),

    #[error("{0}")]
    DuplicateState(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Wraps anything `IntoDbErr` accepts as a `DatabaseError`.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        ServiceError::PreconditionViolation(message.into())
    }

    pub fn capacity(message: impl Into<String>) -> Self {
        ServiceError::CapacityViolation(message.into())
    }

    /// Returns the HTTP status code a transport layer should use for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PreconditionViolation(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::CapacityViolation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DuplicateState(_) => StatusCode::CONFLICT,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::ConfigError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "database_error",
            Self::NotFound(_) => "not_found",
            Self::PreconditionViolation(_) => "precondition_violation",
            Self::CapacityViolation(_) => "capacity_violation",
            Self::DuplicateState(_) => "duplicate_state",
            Self::InvalidInput(_) => "invalid_input",
            Self::EventError(_) => "event_error",
            Self::ConfigError(_) => "config_error",
            Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Domain failures are surfaced for manual retry, so the engine never
    /// retries anything on its own.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Text safe to show a caller. Infrastructure failures collapse to a fixed phrase.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::ConfigError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}
