use axum::body::Bytes;
use axum::extract::Multipart;

use crate::api::errors::ApiError;
use crate::api::validation::{sanitized_filename, validate_document_upload};
use crate::core::config::UploadSettings;

pub(crate) struct UploadedFile {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Bytes,
}

/// Reads the `file` field of a multipart form, enforcing the configured size
/// limit and allowed document types.
pub(crate) async fn read_document(
    mut multipart: Multipart,
    uploads: &UploadSettings,
) -> Result<UploadedFile, ApiError> {
    let max_bytes = uploads.max_upload_bytes();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(sanitized_filename)
            .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
        let content_type =
            field.content_type().unwrap_or("application/octet-stream").to_string();
        validate_document_upload(&filename, &content_type, &uploads.allowed_document_extensions)?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
        {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File size exceeds {}MB limit",
                    uploads.max_upload_size_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile { filename, content_type, bytes: Bytes::from(bytes) });
    }

    Err(ApiError::BadRequest("Multipart field 'file' is required".to_string()))
}
