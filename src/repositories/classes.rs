use async_trait::async_trait;

use crate::db::models::ClassRoom;
use crate::db::MemoryStore;

use super::RepoError;

#[async_trait]
pub(crate) trait ClassRepository {
    async fn get_class(&self, id: &str) -> Result<Option<ClassRoom>, RepoError>;
    async fn list_classes(&self) -> Result<Vec<ClassRoom>, RepoError>;
    async fn create_class(&self, class: ClassRoom) -> Result<ClassRoom, RepoError>;
    async fn update_class(&self, class: ClassRoom) -> Result<ClassRoom, RepoError>;
}

#[async_trait]
impl ClassRepository for MemoryStore {
    async fn get_class(&self, id: &str) -> Result<Option<ClassRoom>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.classes.iter().find(|class| class.id == id).cloned())
    }

    async fn list_classes(&self) -> Result<Vec<ClassRoom>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.classes.clone())
    }

    async fn create_class(&self, class: ClassRoom) -> Result<ClassRoom, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.classes.iter().any(|existing| existing.id == class.id) {
            return Err(RepoError::AlreadyExists { entity: "class", id: class.id });
        }
        tables.classes.push(class.clone());
        Ok(class)
    }

    async fn update_class(&self, class: ClassRoom) -> Result<ClassRoom, RepoError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .classes
            .iter_mut()
            .find(|existing| existing.id == class.id)
            .ok_or_else(|| RepoError::NotFound { entity: "class", id: class.id.clone() })?;
        *slot = class.clone();
        Ok(class)
    }
}
