use std::{fmt, sync::Arc};

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::models::WebResponse;

/// The one header the gate reads. Header lookup is case-insensitive.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// ApiKey
///
/// The pre-shared secret every request must present. Built once from `AppConfig`
/// at startup and shared read-only. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Exact byte comparison in constant time. A missing header never matches.
    pub fn matches(&self, presented: Option<&[u8]>) -> bool {
        match presented {
            Some(candidate) => bool::from(self.0.as_bytes().ct_eq(candidate)),
            None => false,
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// require_api_key
///
/// The Auth Gate. Wrapped around the whole router, so it runs before routing and
/// before any handler, extractor, or store call.
///
/// A missing or wrong key is an ordinary outcome, not an error: the gate answers
/// 401 with the standard envelope itself and the request goes no further.
pub async fn require_api_key(State(key): State<ApiKey>, request: Request, next: Next) -> Response {
    let presented = request.headers().get(&API_KEY_HEADER).map(|value| value.as_bytes());

    if key.matches(presented) {
        return next.run(request).await;
    }

    tracing::warn!(
        method = %request.method(),
        uri = %request.uri(),
        header_present = presented.is_some(),
        "rejected request without a valid api key"
    );
    unauthorized()
}

/// The 401 envelope. Never carries `data`.
pub fn unauthorized() -> Response {
    let status = StatusCode::UNAUTHORIZED;
    (status, Json(WebResponse::<()>::with_status(status, None))).into_response()
}
