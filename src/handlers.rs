use crate::{
    AppState,
    error::{AppError, AppResult},
    extract::{ApiJson, StudentId},
    models::{CreateStudentRequest, StudentResponse, UpdateStudentRequest, WebResponse},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

// --- Handlers ---
//
// Thin adapters: pull typed input out of the request, call the service, wrap the
// result in the envelope. Failures propagate as `AppError` and are rendered by its
// `IntoResponse` impl.

/// find_all
///
/// Lists every student. Order is whatever the store yields.
#[utoipa::path(
    get,
    path = "/api/siswas",
    responses(
        (status = 200, description = "Envelope whose data is the list of students", body = [StudentResponse]),
        (status = 401, description = "Missing or wrong X-API-Key"),
        (status = 500, description = "Store failure")
    ),
    security(("api_key" = []))
)]
pub async fn find_all(
    State(state): State<AppState>,
) -> AppResult<Json<WebResponse<Vec<StudentResponse>>>> {
    let students = state.service.find_all().await?;
    Ok(Json(WebResponse::ok(students)))
}

/// find_by_id
#[utoipa::path(
    get,
    path = "/api/siswas/{id}",
    params(("id" = i64, Path, description = "Siswa ID")),
    responses(
        (status = 200, description = "Envelope whose data is the student", body = StudentResponse),
        (status = 401, description = "Missing or wrong X-API-Key"),
        (status = 404, description = "No student with this id"),
        (status = 500, description = "Store failure")
    ),
    security(("api_key" = []))
)]
pub async fn find_by_id(
    State(state): State<AppState>,
    StudentId(id): StudentId,
) -> AppResult<Json<WebResponse<StudentResponse>>> {
    let student = state.service.find_by_id(id).await?;
    Ok(Json(WebResponse::ok(student)))
}

/// create
///
/// Inserts a new student. The response carries the store-assigned id.
#[utoipa::path(
    post,
    path = "/api/siswas",
    request_body = CreateStudentRequest,
    responses(
        (status = 200, description = "Envelope whose data is the created student", body = StudentResponse),
        (status = 400, description = "Validation failed or body unreadable"),
        (status = 401, description = "Missing or wrong X-API-Key"),
        (status = 500, description = "Store failure")
    ),
    security(("api_key" = []))
)]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateStudentRequest>,
) -> AppResult<Json<WebResponse<StudentResponse>>> {
    let student = state.service.create(payload).await?;
    Ok(Json(WebResponse::ok(student)))
}

/// update
///
/// Replaces every descriptive field of an existing student.
#[utoipa::path(
    put,
    path = "/api/siswas/{id}",
    params(("id" = i64, Path, description = "Siswa ID")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Envelope whose data is the updated student", body = StudentResponse),
        (status = 400, description = "Validation failed or body unreadable"),
        (status = 401, description = "Missing or wrong X-API-Key"),
        (status = 404, description = "No student with this id"),
        (status = 500, description = "Store failure")
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    StudentId(id): StudentId,
    ApiJson(payload): ApiJson<UpdateStudentRequest>,
) -> AppResult<Json<WebResponse<StudentResponse>>> {
    let student = state.service.update(id, payload).await?;
    Ok(Json(WebResponse::ok(student)))
}

/// delete
///
/// The success envelope has no `data` key.
#[utoipa::path(
    delete,
    path = "/api/siswas/{id}",
    params(("id" = i64, Path, description = "Siswa ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 401, description = "Missing or wrong X-API-Key"),
        (status = 404, description = "No student with this id"),
        (status = 500, description = "Store failure")
    ),
    security(("api_key" = []))
)]
pub async fn delete(
    State(state): State<AppState>,
    StudentId(id): StudentId,
) -> AppResult<Json<WebResponse<()>>> {
    state.service.delete(id).await?;
    Ok(Json(WebResponse::ok_empty()))
}

/// not_found
///
/// Router fallback for authenticated requests to paths that match no route.
pub async fn not_found() -> AppError {
    AppError::NotFound("route not found".to_string())
}

/// method_not_allowed
///
/// Fallback for a known path hit with a method it does not serve. Like every
/// other response it is an envelope, here without `data`.
pub async fn method_not_allowed() -> Response {
    let status = StatusCode::METHOD_NOT_ALLOWED;
    (status, Json(WebResponse::<()>::with_status(status, None))).into_response()
}
