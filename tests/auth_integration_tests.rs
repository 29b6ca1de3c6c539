use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use sisko_api::{
    AppConfig, AppState, create_router,
    error::AppResult,
    models::{CreateStudentRequest, StudentResponse, UpdateStudentRequest},
    repository::{MemoryRepository, RepositoryState, TransactionStats},
    service::{ServiceState, StudentService, StudentServiceImpl},
};
use std::sync::Arc;
use tower::ServiceExt;

const KEY: &str = "RAHASIA";

// --- Router Helpers ---

fn router_over(repo: &MemoryRepository) -> Router {
    let repo = Arc::new(repo.clone()) as RepositoryState;
    let service = Arc::new(StudentServiceImpl::new(repo)) as ServiceState;
    create_router(AppState::new(service, AppConfig::default()))
}

fn request(method: Method, uri: &str, key: Option<(&str, &str)>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((name, value)) = key {
        builder = builder.header(name, value);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn authed(method: Method, uri: &str, body: Option<&str>) -> Request<Body> {
    request(method, uri, Some(("X-API-Key", KEY)), body)
}

// --- Auth Gate ---

#[tokio::test]
async fn test_missing_or_wrong_key_is_401_everywhere() {
    let repo = MemoryRepository::new();
    let router = router_over(&repo);

    let routes = [
        (Method::GET, "/api/siswas", None),
        (Method::GET, "/api/siswas/1", None),
        (Method::POST, "/api/siswas", Some(r#"{"name":"Gadget"}"#)),
        (Method::PUT, "/api/siswas/1", Some(r#"{"name":"Gadget"}"#)),
        (Method::DELETE, "/api/siswas/1", None),
        (Method::GET, "/api/nowhere", None),
        (Method::GET, "/api-docs/openapi.json", None),
    ];
    let bad_keys = [
        None,
        Some(("X-API-Key", "SALAH")),
        Some(("X-API-Key", "rahasia")),
        Some(("X-API-Key", "RAHASIA ")),
        // Wrong header names seen in older clients.
        Some(("X-API_Key", KEY)),
        Some(("API-Key", KEY)),
    ];

    for (method, uri, body) in routes.iter() {
        for key in bad_keys.iter() {
            let (status, json) = send(&router, request(method.clone(), uri, *key, *body)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri} with {key:?}");
            assert_eq!(json, serde_json::json!({"code": 401, "status": "UNAUTHORIZED"}));
        }
    }

    // Nothing reached the service, let alone the store.
    assert_eq!(repo.stats(), TransactionStats::default());
    assert!(repo.rows().is_empty());
}

#[tokio::test]
async fn test_header_name_is_case_insensitive() {
    let router = router_over(&MemoryRepository::new());
    let (status, json) = send(
        &router,
        request(Method::GET, "/api/siswas", Some(("x-api-key", KEY)), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "OK");
}

#[tokio::test]
async fn test_cors_preflight_needs_the_key_too() {
    let repo = MemoryRepository::new();
    let router = router_over(&repo);

    let preflight = |key: Option<(&str, &str)>| {
        let mut req = request(Method::OPTIONS, "/api/siswas", key, None);
        let headers = req.headers_mut();
        headers.insert(header::ORIGIN, "http://localhost:5173".parse().unwrap());
        headers.insert(
            header::ACCESS_CONTROL_REQUEST_METHOD,
            "DELETE".parse().unwrap(),
        );
        req
    };

    let (status, json) = send(&router, preflight(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json, serde_json::json!({"code": 401, "status": "UNAUTHORIZED"}));

    let response = router
        .clone()
        .oneshot(preflight(Some(("X-API-Key", KEY))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );

    assert_eq!(repo.stats(), TransactionStats::default());
}

// --- Transport Adapter ---

#[tokio::test]
async fn test_malformed_json_is_400() {
    let repo = MemoryRepository::new();
    let router = router_over(&repo);

    let (status, json) = send(&router, authed(Method::POST, "/api/siswas", Some("{not json"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    assert_eq!(json["status"], "BAD REQUEST");
    assert_eq!(repo.stats(), TransactionStats::default());
}

#[tokio::test]
async fn test_non_integer_id_is_404() {
    let router = router_over(&MemoryRepository::new());

    for method in [Method::GET, Method::DELETE] {
        let (status, json) = send(&router, authed(method, "/api/siswas/abc", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], "NOT FOUND");
    }
}

#[tokio::test]
async fn test_unsupported_method_is_405_envelope() {
    let repo = MemoryRepository::new();
    let router = router_over(&repo);

    for (method, uri) in [
        (Method::PATCH, "/api/siswas/1"),
        (Method::DELETE, "/api/siswas"),
        (Method::POST, "/api/siswas/1"),
    ] {
        let (status, json) = send(&router, authed(method.clone(), uri, None)).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        assert_eq!(
            json,
            serde_json::json!({"code": 405, "status": "METHOD NOT ALLOWED"})
        );
    }

    // The gate still answers first for a request without the key.
    let (status, _) = send(
        &router,
        request(Method::PATCH, "/api/siswas/1", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(repo.stats(), TransactionStats::default());
}

#[tokio::test]
async fn test_update_ignores_malformed_body_id() {
    let router = router_over(&MemoryRepository::new());
    let (_, created) = send(
        &router,
        authed(Method::POST, "/api/siswas", Some(r#"{"name":"Gadget"}"#)),
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, json) = send(
        &router,
        authed(
            Method::PUT,
            &format!("/api/siswas/{id}"),
            Some(r#"{"id":"x","name":"Gizmo"}"#),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["name"], "Gizmo");
}

#[tokio::test]
async fn test_concurrent_creates_are_all_kept() {
    let repo = MemoryRepository::new();
    let router = router_over(&repo);

    let mut tasks = tokio::task::JoinSet::new();
    for n in 0..32 {
        let router = router.clone();
        tasks.spawn(async move {
            let body = format!(r#"{{"name":"Siswa {n}"}}"#);
            send(&router, authed(Method::POST, "/api/siswas", Some(body.as_str()))).await
        });
    }
    let mut ids = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (status, json) = joined.unwrap();
        assert_eq!(status, StatusCode::OK);
        ids.push(json["data"]["id"].as_i64().unwrap());
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 32, "every create got its own id");

    let (status, json) = send(&router, authed(Method::GET, "/api/siswas", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 32);
    assert_eq!(repo.rows().len(), 32);
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let router = router_over(&MemoryRepository::new());
    let (status, json) = send(&router, authed(Method::GET, "/api/guru", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 404);
    assert_eq!(json["status"], "NOT FOUND");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let router = router_over(&MemoryRepository::new());
    let response = router
        .oneshot(authed(Method::GET, "/api/siswas", None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Panic Recovery ---

struct PanickingService;

#[async_trait]
impl StudentService for PanickingService {
    async fn create(&self, _req: CreateStudentRequest) -> AppResult<StudentResponse> {
        panic!("connection string postgres://admin:hunter2@db exploded")
    }
    async fn update(&self, _id: i64, _req: UpdateStudentRequest) -> AppResult<StudentResponse> {
        panic!("update exploded")
    }
    async fn delete(&self, _id: i64) -> AppResult<()> {
        panic!("delete exploded")
    }
    async fn find_by_id(&self, _id: i64) -> AppResult<StudentResponse> {
        panic!("find_by_id exploded")
    }
    async fn find_all(&self) -> AppResult<Vec<StudentResponse>> {
        panic!("find_all exploded")
    }
}

#[tokio::test]
async fn test_panic_becomes_opaque_500() {
    let service = Arc::new(PanickingService) as ServiceState;
    let router = create_router(AppState::new(service, AppConfig::default()));

    let (status, json) = send(
        &router,
        authed(Method::POST, "/api/siswas", Some(r#"{"name":"Gadget"}"#)),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json,
        serde_json::json!({"code": 500, "status": "INTERNAL SERVER ERROR"})
    );

    // The router keeps serving after a panic.
    let (status, _) = send(&router, authed(Method::GET, "/api/siswas", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
