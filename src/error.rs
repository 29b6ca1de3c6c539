use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{models::WebResponse, repository::RepositoryError, validation::ValidationError};

/// Result type for service and handler operations.
pub type AppResult<T> = Result<T, AppError>;

/// AppError
///
/// The tagged outcome of a failed request. Every layer below the handlers returns
/// one of these instead of unwinding; the `IntoResponse` impl below is the single
/// place where a failure becomes an HTTP status and envelope.
#[derive(Debug, Error)]
pub enum AppError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// A payload violated a declared field constraint.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The body could not be decoded into the expected payload.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The referenced student does not exist.
    #[error("{0}")]
    NotFound(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// The store failed to execute a statement, begin, or commit.
    #[error("store failure: {0}")]
    Store(RepositoryError),

    /// Anything else, including panics caught at the edge of the router.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => AppError::NotFound(err.to_string()),
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error Translator
///
/// Client errors carry their message as `data`. Server errors are logged with full
/// detail and answered with the bare status text, so nothing about the store or
/// the failure leaks to the caller.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let data = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            None
        } else {
            tracing::debug!(error = %self, "request rejected");
            Some(self.to_string())
        };
        (status, Json(WebResponse::with_status(status, data))).into_response()
    }
}

/// handle_panic
///
/// Response factory for `CatchPanicLayer`. A panic anywhere below the layer is
/// reported like any other unclassified failure.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    AppError::Internal(format!("panic: {detail}")).into_response()
}
