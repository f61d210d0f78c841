use serde::Serialize;

use crate::db::models::StoredDocument;
use crate::db::types::DocumentKind;

use super::format_primitive;

#[derive(Debug, Serialize)]
pub(crate) struct DocumentResponse {
    pub(crate) id: String,
    pub(crate) kind: DocumentKind,
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) size: usize,
    pub(crate) sha256: String,
    pub(crate) uploaded_at: String,
    pub(crate) url: String,
}

impl DocumentResponse {
    pub(crate) fn from_db(document: &StoredDocument, url: String) -> Self {
        Self {
            id: document.id.clone(),
            kind: document.kind,
            filename: document.filename.clone(),
            content_type: document.content_type.clone(),
            size: document.size(),
            sha256: document.sha256.clone(),
            uploaded_at: format_primitive(document.uploaded_at),
            url,
        }
    }
}
