use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// ApiJson Extractor
///
/// `axum::Json` with its rejection folded into `AppError`, so an unreadable body
/// comes back as a 400 envelope instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::InvalidBody(rejection.body_text())),
        }
    }
}

/// StudentId Extractor
///
/// The `{id}` path segment as a store identifier. A segment that is not an
/// integer cannot name any stored student, so it is rejected as not found.
#[derive(Debug, Clone, Copy)]
pub struct StudentId(pub i64);

impl<S> FromRequestParts<S> for StudentId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i64>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(StudentId(id)),
            Err(rejection) => {
                tracing::debug!("unparseable siswa id: {}", rejection.body_text());
                Err(AppError::NotFound("siswa is not found".to_string()))
            }
        }
    }
}
