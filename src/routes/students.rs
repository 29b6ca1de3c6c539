use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Student Router Module
///
/// The five CRUD endpoints over the `siswa` resource. Mounted under `/api` by
/// `create_router`, behind the API key gate that wraps the whole application.
pub fn student_routes() -> Router<AppState> {
    Router::new()
        // GET /siswas lists every student, POST /siswas creates one.
        .route("/siswas", get(handlers::find_all).post(handlers::create))
        // GET/PUT/DELETE /siswas/{id}
        // Non-integer ids are answered with 404 by the `StudentId` extractor.
        .route(
            "/siswas/{id}",
            get(handlers::find_by_id)
                .put(handlers::update)
                .delete(handlers::delete),
        )
}
