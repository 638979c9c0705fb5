//! Typed errors and HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Message sent to clients for unexpected failures.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Message sent to clients when the database cannot be reached.
pub const DB_UNAVAILABLE_MESSAGE: &str = "database unavailable";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid port: {0}")]
    InvalidPort(String),
    #[error("invalid environment: {0} (expected development, production or test)")]
    InvalidEnvironment(String),
    #[error("resource {collection}: {reason}")]
    InvalidResource { collection: String, reason: String },
}

/// Fatal errors while standing up a service. These abort startup.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    App(#[from] AppError),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{field} already exists")]
    Conflict { field: String },
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("{0}")]
    Unavailable(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
    #[error("database unavailable: {0}")]
    DbUnavailable(sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

/// Real cause of an unexpected error, attached to the response so the
/// error-detail middleware can expose it outside production.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::Configuration(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unavailable(_) | AppError::DbUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Db(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_unexpected(&self) -> bool {
        matches!(self, AppError::Db(_) | AppError::Internal(_))
    }
}

/// Connection-level failures (pool exhausted or closed, socket/TLS errors, SQLSTATE
/// class 08 and server shutdown codes) mean the database is unreachable, not that
/// the statement was wrong.
fn is_connection_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| code.starts_with("08") || matches!(code.as_ref(), "57P01" | "57P02" | "57P03"))
            .unwrap_or(false),
        _ => false,
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            AppError::DbUnavailable(err)
        } else {
            AppError::Db(err)
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge;
        }
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::DbUnavailable(_) = &self {
            tracing::warn!(error = %self, "database unreachable");
            let mut response = crate::response::failure(status, DB_UNAVAILABLE_MESSAGE).into_response();
            response.extensions_mut().insert(ErrorDetail(self.to_string()));
            return response;
        }
        if self.is_unexpected() {
            tracing::error!(error = %self, "request failed");
            let mut response = crate::response::failure(status, INTERNAL_MESSAGE).into_response();
            response.extensions_mut().insert(ErrorDetail(self.to_string()));
            return response;
        }
        crate::response::failure(status, self.to_string()).into_response()
    }
}
