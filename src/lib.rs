use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey as ApiKeyScheme, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Request pipeline, outermost first.
pub mod auth;
pub mod extract;
pub mod handlers;
pub mod error;
pub mod service;
pub mod validation;
pub mod repository;

// Shared types and startup configuration.
pub mod models;
pub mod config;

pub mod routes;

// --- Public Re-exports ---

pub use auth::ApiKey;
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use service::{ServiceState, StudentServiceImpl};

/// ApiDoc
///
/// The OpenAPI document for the service, served at `/api-docs/openapi.json`.
/// Like every other route it sits behind the API key gate.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::find_all, handlers::find_by_id, handlers::create,
        handlers::update, handlers::delete
    ),
    components(
        schemas(
            models::CreateStudentRequest, models::UpdateStudentRequest, models::StudentResponse,
        )
    ),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "siswa", description = "Student records API")
    )
)]
pub struct ApiDoc;

/// Registers the `X-API-Key` header scheme referenced by every path.
struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKeyScheme::Header(ApiKeyValue::new(
                    auth::API_KEY_HEADER.as_str(),
                ))),
            );
        }
    }
}

/// AppState
///
/// The single, immutable container shared by every request: the service layer
/// (which owns the connection pool), the loaded configuration, and the API key
/// derived from it.
#[derive(Clone)]
pub struct AppState {
    pub service: ServiceState,
    pub config: AppConfig,
    pub api_key: ApiKey,
}

impl AppState {
    pub fn new(service: ServiceState, config: AppConfig) -> Self {
        let api_key = ApiKey::new(config.api_key.as_str());
        Self {
            service,
            config,
            api_key,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ServiceState {
    fn from_ref(app_state: &AppState) -> ServiceState {
        app_state.service.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for ApiKey {
    fn from_ref(app_state: &AppState) -> ApiKey {
        app_state.api_key.clone()
    }
}

/// create_router
///
/// Assembles the routes, the API key gate, and the observability layers.
///
/// Layer order, outermost first: request id, tracing, request id propagation,
/// panic recovery, API key gate, CORS, routing. The gate therefore sees every
/// request, including ones for unknown paths, the documentation routes, and CORS
/// preflights. A preflight is answered by `CorsLayer` only once it carries the key.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", routes::students::student_routes())
        // Must follow every route: it only reaches routes registered before it.
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .layer(cors)
        // Added last so that it wraps everything above, CORS included.
        .layer(middleware::from_fn_with_state(
            state.api_key.clone(),
            auth::require_api_key,
        ))
        .with_state(state);

    // 3. Observability, Correlation, and Panic Recovery
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id))
                // Last line of recovery: a panic becomes a 500 envelope, not a dropped connection.
                .layer(CatchPanicLayer::custom(error::handle_panic)),
        )
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` set by
/// `SetRequestIdLayer` so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
