//! Facade wiring the table registry and the relation graph manager together

use std::sync::Arc;

use uuid::Uuid;

use super::executor::DdlExecutor;
use super::registry::{RegistryError, TableRegistry};
use super::relations::{RelationError, RelationGraphManager};
use super::schema::TableDesign;
use super::store::{InMemoryRelationStore, InMemoryTableDesignStore, RelationStore, TableDesignStore};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Relation(#[from] RelationError),
}

/// Schema engine: table designs plus the relations between them.
///
/// The relation manager resolves tables through the registry, so relations
/// can only be created between designs the registry knows about. Both share
/// one set of project locks, which keeps a table delete and a relation write
/// in the same project from interleaving.
pub struct SchemaEngine {
    tables: Arc<TableRegistry>,
    relations: RelationGraphManager,
}

impl SchemaEngine {
    pub fn new(
        designs: Arc<dyn TableDesignStore>,
        relations: Arc<dyn RelationStore>,
        executor: Arc<dyn DdlExecutor>,
    ) -> Self {
        Self::from_registry(TableRegistry::new(designs, executor), relations)
    }

    /// Engine over a preconfigured registry
    pub fn from_registry(registry: TableRegistry, relations: Arc<dyn RelationStore>) -> Self {
        let tables = Arc::new(registry);
        let relations = RelationGraphManager::new(relations, tables.clone())
            .with_locks(tables.locks().clone());
        Self { tables, relations }
    }

    /// Engine with both stores kept in memory
    pub fn in_memory(executor: Arc<dyn DdlExecutor>) -> Self {
        Self::new(
            Arc::new(InMemoryTableDesignStore::new()),
            Arc::new(InMemoryRelationStore::new()),
            executor,
        )
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    pub fn relations(&self) -> &RelationGraphManager {
        &self.relations
    }

    /// Delete a design and every relation that references it
    pub async fn delete_table(&self, id: Uuid) -> Result<TableDesign, EngineError> {
        let project_id = self.tables.get(id).await?.project_id;
        let _guard = self.tables.locks().lock(project_id).await;

        let design = self.tables.delete_locked(id).await?;
        let removed = self.relations.delete_by_table(id).await?;
        tracing::info!(table_id = %id, relations_removed = removed, "Table and its relations deleted");
        Ok(design)
    }
}
