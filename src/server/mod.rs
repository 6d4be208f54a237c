//! HTTP front end: a JSON API over [`NoteService`] plus a single browser page.
//!
//! Routes live in [`routes`]; this module owns the shared state, the error
//! mapping and the listener loop.

mod routes;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::service::{NoteService, ServiceError};

/// Handlers run the blocking SQLite calls inline while holding the lock.
/// One local user and millisecond queries do not justify `spawn_blocking`.
pub struct AppState {
    pub service: Mutex<NoteService>,
}

impl AppState {
    pub fn new(service: NoteService) -> Self {
        Self {
            service: Mutex::new(service),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/health", get(routes::health))
        .route(
            "/api/notes",
            get(routes::list_notes).post(routes::create_note),
        )
        .route(
            "/api/notes/:identifier",
            get(routes::get_note)
                .patch(routes::edit_note)
                .delete(routes::delete_note),
        )
        .route("/api/notes/:identifier/pin", post(routes::pin_note))
        .route("/api/notes/:identifier/archive", post(routes::archive_note))
        .route("/api/notes/:identifier/restore", post(routes::restore_note))
        .route("/api/notes/:identifier/purge", post(routes::purge_note))
        .route("/api/notes/:identifier/links", get(routes::links))
        .route("/api/notes/:identifier/backlinks", get(routes::backlinks))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(service: NoteService, addr: &str) -> std::io::Result<()> {
    if let Some(path) = service.store().path() {
        let count =
            crate::db::count_notes(service.store().conn()).map_err(std::io::Error::other)?;
        log::info!("using notes database {} ({} notes)", path.display(), count);
    }
    let app = router(Arc::new(AppState::new(service)));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("notely listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}

/// A [`ServiceError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) | ServiceError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Io(_) | ServiceError::Db(_) | ServiceError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();
        if status.is_server_error() {
            log::error!("request failed: {}", message);
        } else {
            log::warn!("request rejected ({}): {}", status.as_u16(), message);
        }

        let body = Json(serde_json::json!({
            "error": message,
        }));
        (status, body).into_response()
    }
}
