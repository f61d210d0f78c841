use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::api::errors::ApiError;
use crate::api::helpers::fetch_document;
use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:document_id", get(download_document))
}

/// Serves a stored document with its original content type and filename.
async fn download_document(
    Path(document_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let document = fetch_document(&state, &document_id).await?;

    let content_type = HeaderValue::from_str(&document.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    // Stored filenames are sanitized on upload, so quoting is enough here.
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", document.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("private, max-age=300")),
        ],
        document.bytes,
    )
        .into_response())
}
