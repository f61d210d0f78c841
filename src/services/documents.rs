use axum::body::Bytes;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::StoredDocument;
use crate::db::types::DocumentKind;
use crate::repositories::{DocumentRepository, RepoError, Repositories};

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub(crate) async fn store_document(
    repos: &dyn Repositories,
    kind: DocumentKind,
    filename: &str,
    content_type: &str,
    bytes: Bytes,
) -> Result<StoredDocument, RepoError> {
    let document = StoredDocument {
        id: Uuid::new_v4().to_string(),
        kind,
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        sha256: sha256_hex(&bytes),
        bytes,
        uploaded_at: primitive_now_utc(),
    };

    let stored = repos.create_document(document).await?;
    tracing::debug!(
        document_id = %stored.id,
        kind = ?stored.kind,
        size = stored.size(),
        "Document stored"
    );
    Ok(stored)
}
