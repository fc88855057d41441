//! Persistence seams for table designs and relations
//!
//! The registry and the relation manager talk to storage only through the
//! traits below. In-memory implementations back tests and dry runs; the
//! PostgreSQL implementations live in `db::repositories`.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::schema::{ParseEnumError, RelationType, TableDesign, TableRelation};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Record already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Invalid stored value: {0}")]
    InvalidValue(#[from] ParseEnumError),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for table designs
#[async_trait]
pub trait TableDesignStore: Send + Sync {
    async fn insert(&self, design: &TableDesign) -> Result<(), StoreError>;

    /// Overwrite a stored design; `NotFound` when it does not exist
    async fn update(&self, design: &TableDesign) -> Result<(), StoreError>;

    /// Returns whether a design was removed
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableDesign>, StoreError>;

    async fn find_by_code(
        &self,
        project_id: Uuid,
        code: &str,
    ) -> Result<Option<TableDesign>, StoreError>;

    /// All designs in creation order
    async fn list(&self) -> Result<Vec<TableDesign>, StoreError>;

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<TableDesign>, StoreError>;

    /// Designs with `synced == false`, in creation order
    async fn list_unsynced(&self) -> Result<Vec<TableDesign>, StoreError>;
}

/// Storage for relations and their column mappings
#[async_trait]
pub trait RelationStore: Send + Sync {
    async fn insert(&self, relation: &TableRelation) -> Result<(), StoreError>;

    /// Overwrite a stored relation, replacing its column mappings as a whole
    async fn update(&self, relation: &TableRelation) -> Result<(), StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Remove every relation with `table_id` at either end; returns how many
    async fn delete_by_table(&self, table_id: Uuid) -> Result<u64, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableRelation>, StoreError>;

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<TableRelation>, StoreError>;

    /// Relations with `table_id` as source or target
    async fn find_by_table(&self, table_id: Uuid) -> Result<Vec<TableRelation>, StoreError>;

    /// Relations between two tables in either direction
    async fn find_between(
        &self,
        table_a: Uuid,
        table_b: Uuid,
    ) -> Result<Vec<TableRelation>, StoreError>;

    async fn find_by_project_and_type(
        &self,
        project_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<TableRelation>, StoreError>;
}

// ============================================================================
// In-Memory Stores
// ============================================================================

/// Table design store kept in process memory
#[derive(Default)]
pub struct InMemoryTableDesignStore {
    designs: RwLock<Vec<TableDesign>>,
}

impl InMemoryTableDesignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TableDesignStore for InMemoryTableDesignStore {
    async fn insert(&self, design: &TableDesign) -> Result<(), StoreError> {
        let mut designs = self.designs.write().await;
        if designs.iter().any(|d| d.id == design.id) {
            return Err(StoreError::AlreadyExists(design.id));
        }
        designs.push(design.clone());
        Ok(())
    }

    async fn update(&self, design: &TableDesign) -> Result<(), StoreError> {
        let mut designs = self.designs.write().await;
        let slot = designs
            .iter_mut()
            .find(|d| d.id == design.id)
            .ok_or(StoreError::NotFound(design.id))?;
        *slot = design.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut designs = self.designs.write().await;
        let before = designs.len();
        designs.retain(|d| d.id != id);
        Ok(designs.len() != before)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableDesign>, StoreError> {
        let designs = self.designs.read().await;
        Ok(designs.iter().find(|d| d.id == id).cloned())
    }

    async fn find_by_code(
        &self,
        project_id: Uuid,
        code: &str,
    ) -> Result<Option<TableDesign>, StoreError> {
        let designs = self.designs.read().await;
        Ok(designs
            .iter()
            .find(|d| d.project_id == project_id && d.code == code)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<TableDesign>, StoreError> {
        Ok(self.designs.read().await.clone())
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<TableDesign>, StoreError> {
        let designs = self.designs.read().await;
        Ok(designs
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_unsynced(&self) -> Result<Vec<TableDesign>, StoreError> {
        let designs = self.designs.read().await;
        Ok(designs.iter().filter(|d| !d.synced).cloned().collect())
    }
}

/// Relation store kept in process memory
#[derive(Default)]
pub struct InMemoryRelationStore {
    relations: RwLock<Vec<TableRelation>>,
}

impl InMemoryRelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn filtered<F>(&self, predicate: F) -> Vec<TableRelation>
    where
        F: Fn(&TableRelation) -> bool,
    {
        self.relations
            .read()
            .await
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RelationStore for InMemoryRelationStore {
    async fn insert(&self, relation: &TableRelation) -> Result<(), StoreError> {
        let mut relations = self.relations.write().await;
        if relations.iter().any(|r| r.id == relation.id) {
            return Err(StoreError::AlreadyExists(relation.id));
        }
        relations.push(relation.clone());
        Ok(())
    }

    async fn update(&self, relation: &TableRelation) -> Result<(), StoreError> {
        let mut relations = self.relations.write().await;
        let slot = relations
            .iter_mut()
            .find(|r| r.id == relation.id)
            .ok_or(StoreError::NotFound(relation.id))?;
        *slot = relation.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut relations = self.relations.write().await;
        let before = relations.len();
        relations.retain(|r| r.id != id);
        Ok(relations.len() != before)
    }

    async fn delete_by_table(&self, table_id: Uuid) -> Result<u64, StoreError> {
        let mut relations = self.relations.write().await;
        let before = relations.len();
        relations.retain(|r| r.source_table_id != table_id && r.target_table_id != table_id);
        Ok((before - relations.len()) as u64)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableRelation>, StoreError> {
        let relations = self.relations.read().await;
        Ok(relations.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<TableRelation>, StoreError> {
        Ok(self.filtered(|r| r.project_id == project_id).await)
    }

    async fn find_by_table(&self, table_id: Uuid) -> Result<Vec<TableRelation>, StoreError> {
        Ok(self
            .filtered(|r| r.source_table_id == table_id || r.target_table_id == table_id)
            .await)
    }

    async fn find_between(
        &self,
        table_a: Uuid,
        table_b: Uuid,
    ) -> Result<Vec<TableRelation>, StoreError> {
        Ok(self
            .filtered(|r| {
                (r.source_table_id == table_a && r.target_table_id == table_b)
                    || (r.source_table_id == table_b && r.target_table_id == table_a)
            })
            .await)
    }

    async fn find_by_project_and_type(
        &self,
        project_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<TableRelation>, StoreError> {
        Ok(self
            .filtered(|r| r.project_id == project_id && r.relation_type == relation_type)
            .await)
    }
}
