use std::path::Path;

use validator::Validate;

use crate::api::errors::ApiError;

pub(crate) fn validate_payload(payload: &impl Validate) -> Result<(), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub(crate) fn validate_document_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<(), ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime == "application/octet-stream" || mime_allowed_for_extension(&mime, &extension) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "pdf" => mime == "application/pdf",
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "webp" => mime == "image/webp",
        "txt" => mime == "text/plain",
        "md" => matches!(mime, "text/markdown" | "text/plain"),
        "docx" => {
            mime == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => false,
    }
}

/// Keeps the last path segment and replaces anything unusual, so stored names
/// are safe to echo back in `Content-Disposition`.
pub(crate) fn sanitized_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
