//! Defines routes for the file gateway.
//!
//! ## Structure
//! - **File endpoints**
//!   - `POST   /files/upload`               — multipart upload (field `file`)
//!   - `GET    /files/download/{filename}`  — stream an object as an attachment
//!   - `GET    /files/list`                 — list every object with its URL
//!   - `GET    /files/url/{file_name}`      — 24h presigned GET URL
//!   - `DELETE /files/{filename}`           — delete an existing object
//!
//! - **Probes**
//!   - `GET    /healthz`, `GET /readyz`

use crate::{
    handlers::{
        file_handlers::{delete_file, download_file, file_url, list_files, upload_file},
        health_handlers::{healthz, readyz},
    },
    services::gateway_service::GatewayService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};

/// Build and return the router for all gateway routes.
///
/// The router carries shared state (`GatewayService`) to all handlers;
/// request bodies above `max_upload_bytes` are rejected with 413.
pub fn routes(max_upload_bytes: usize) -> Router<GatewayService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // File routes
        .route("/files/upload", post(upload_file))
        .route("/files/download/{filename}", get(download_file))
        .route("/files/list", get(list_files))
        .route("/files/url/{file_name}", get(file_url))
        .route("/files/{filename}", delete(delete_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}
