use async_trait::async_trait;

use crate::db::models::StoredDocument;
use crate::db::MemoryStore;

use super::RepoError;

#[async_trait]
pub(crate) trait DocumentRepository {
    async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>, RepoError>;
    async fn create_document(&self, document: StoredDocument)
        -> Result<StoredDocument, RepoError>;
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.documents.get(id).cloned())
    }

    async fn create_document(
        &self,
        document: StoredDocument,
    ) -> Result<StoredDocument, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.documents.contains_key(&document.id) {
            return Err(RepoError::AlreadyExists { entity: "document", id: document.id });
        }
        tables.documents.insert(document.id.clone(), document.clone());
        Ok(document)
    }
}
