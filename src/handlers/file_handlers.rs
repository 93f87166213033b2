//! HTTP handlers for the `/files` endpoints.
//! Downloads stream straight from the object store without buffering; all
//! storage policy lives in `GatewayService`.

use crate::{
    errors::AppError,
    models::file::{AccessUrl, DeleteReceipt, ListingEntry},
    services::gateway_service::GatewayService,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Everything outside RFC 5987 `attr-char` is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// POST `/files/upload` — store the `file` field of a multipart body.
pub async fn upload_file(
    State(service): State<GatewayService>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("skipping multipart field {:?}", field.name());
            continue;
        }

        let original_name = field
            .file_name()
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::bad_request("field `file` carries no filename"))?;
        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let payload = field.bytes().await.map_err(multipart_error)?;
        let size = payload.len();

        let receipt = service
            .store(payload, &original_name, size, &content_type)
            .await?;
        return Ok((StatusCode::CREATED, Json(receipt)));
    }

    Err(AppError::bad_request("multipart body has no `file` field"))
}

/// GET `/files/download/{filename}` — stream an object as an attachment.
pub async fn download_file(
    State(service): State<GatewayService>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let object = service
        .retrieve(&filename)
        .await
        .map_err(|err| AppError::missing_object(err, "file not found"))?;

    let content_length = object.content_length;
    debug!(
        "streaming {} ({:?}, {:?} bytes)",
        filename, object.content_type, content_length
    );
    let mut response = Response::new(Body::from_stream(object.stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
    );
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&filename));
    if let Some(length) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(response)
}

/// GET `/files/list` — every object in the bucket.
pub async fn list_files(
    State(service): State<GatewayService>,
) -> Result<Json<Vec<ListingEntry>>, AppError> {
    Ok(Json(service.list().await?))
}

/// GET `/files/url/{file_name}` — presigned URL valid for 24 hours.
pub async fn file_url(
    State(service): State<GatewayService>,
    Path(file_name): Path<String>,
) -> Result<Json<AccessUrl>, AppError> {
    service
        .access_url(&file_name)
        .await
        .map(Json)
        .map_err(|err| AppError::missing_object(err, "file does not exist or is inaccessible"))
}

/// DELETE `/files/{filename}` — remove an existing object.
pub async fn delete_file(
    State(service): State<GatewayService>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteReceipt>, AppError> {
    Ok(Json(service.delete(&filename).await?))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

/// `attachment; filename="<key>"`, falling back to the RFC 6266 extended
/// form when the key is not plain visible ASCII.
fn content_disposition(key: &str) -> HeaderValue {
    let value = if key.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
        format!("attachment; filename=\"{}\"", escaped)
    } else {
        format!(
            "attachment; filename*=UTF-8''{}",
            utf8_percent_encode(key, ATTR_CHAR)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
