//! Relation graph manager
//!
//! Relations are directed edges `source -> target` between table designs of a
//! project. Every create and update is checked against the project's stored
//! edges so that no edge closes a cycle reachable from its source table.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use petgraph::graphmap::DiGraphMap;
use uuid::Uuid;

use super::locks::ProjectLocks;
use super::schema::{RelationInput, RelationType, TableDesign, TableRelation};
use super::store::{RelationStore, StoreError};

/// Failure to resolve a table design by id
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Table design not found: {0}")]
    NotFound(Uuid),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Source of truth for table existence
#[async_trait]
pub trait TableLookup: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<TableDesign, LookupError>;
}

/// Relation errors
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    #[error("Relation not found: {0}")]
    NotFound(Uuid),

    #[error("Relation {source_table_id} -> {target_table_id} would create a circular dependency")]
    CircularDependency {
        source_table_id: Uuid,
        target_table_id: Uuid,
    },

    #[error("Table lookup failed: {0}")]
    Lookup(#[from] LookupError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// True when a walk from `start` meets a node that is still on the walk's path
fn cycle_reachable_from(graph: &DiGraphMap<Uuid, ()>, start: Uuid) -> bool {
    let mut visited = HashSet::from([start]);
    let mut on_stack = HashSet::from([start]);
    let mut stack = vec![(start, graph.neighbors(start))];

    while let Some((node, neighbors)) = stack.last_mut() {
        let node = *node;
        match neighbors.next() {
            Some(next) if on_stack.contains(&next) => return true,
            Some(next) if visited.contains(&next) => {}
            Some(next) => {
                visited.insert(next);
                on_stack.insert(next);
                stack.push((next, graph.neighbors(next)));
            }
            None => {
                on_stack.remove(&node);
                stack.pop();
            }
        }
    }

    false
}

/// Manages relations of all projects over a [`RelationStore`]
pub struct RelationGraphManager {
    store: Arc<dyn RelationStore>,
    tables: Arc<dyn TableLookup>,
    locks: ProjectLocks,
}

impl RelationGraphManager {
    pub fn new(store: Arc<dyn RelationStore>, tables: Arc<dyn TableLookup>) -> Self {
        Self {
            store,
            tables,
            locks: ProjectLocks::new(),
        }
    }

    /// Serialize writes with another component that mutates the same projects
    pub fn with_locks(mut self, locks: ProjectLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Both endpoints must resolve to existing table designs
    pub async fn validate(&self, relation: &RelationInput) -> Result<bool, RelationError> {
        for table_id in [relation.source_table_id, relation.target_table_id] {
            match self.tables.get_by_id(table_id).await {
                Ok(_) => {}
                Err(LookupError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    /// Whether persisting `candidate` would leave a cycle reachable from its
    /// source table. For a stored relation the candidate's endpoints replace
    /// the stored ones.
    pub async fn check_circular(
        &self,
        project_id: Uuid,
        candidate: &RelationInput,
    ) -> Result<bool, RelationError> {
        let relations = self.store.find_by_project(project_id).await?;

        let mut graph = DiGraphMap::new();
        for relation in relations.iter().filter(|r| Some(r.id) != candidate.id) {
            graph.add_edge(relation.source_table_id, relation.target_table_id, ());
        }
        graph.add_edge(candidate.source_table_id, candidate.target_table_id, ());

        Ok(cycle_reachable_from(&graph, candidate.source_table_id))
    }

    async fn admit(&self, candidate: &RelationInput) -> Result<(), RelationError> {
        if !self.validate(candidate).await? {
            tracing::warn!(
                source_table_id = %candidate.source_table_id,
                target_table_id = %candidate.target_table_id,
                "Relation rejected: unknown table"
            );
            return Err(RelationError::InvalidRelation(
                "source or target table does not exist".to_string(),
            ));
        }

        if self.check_circular(candidate.project_id, candidate).await? {
            tracing::warn!(
                source_table_id = %candidate.source_table_id,
                target_table_id = %candidate.target_table_id,
                "Relation rejected: circular dependency"
            );
            return Err(RelationError::CircularDependency {
                source_table_id: candidate.source_table_id,
                target_table_id: candidate.target_table_id,
            });
        }

        Ok(())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Validate, check for cycles and store a new relation
    pub async fn create(&self, input: RelationInput) -> Result<TableRelation, RelationError> {
        let candidate = RelationInput { id: None, ..input };

        let _guard = self.locks.lock(candidate.project_id).await;
        self.admit(&candidate).await?;

        let now = Utc::now();
        let relation = TableRelation {
            id: Uuid::new_v4(),
            project_id: candidate.project_id,
            source_table_id: candidate.source_table_id,
            target_table_id: candidate.target_table_id,
            relation_type: candidate.relation_type,
            description: candidate.description,
            column_mappings: candidate.column_mappings,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&relation).await?;

        tracing::info!(
            relation_id = %relation.id,
            project_id = %relation.project_id,
            relation_type = %relation.relation_type,
            "Relation created"
        );
        Ok(relation)
    }

    /// Replace a stored relation's endpoints, type, description and mappings
    pub async fn update(
        &self,
        id: Uuid,
        input: RelationInput,
    ) -> Result<TableRelation, RelationError> {
        let project_id = self.get(id).await?.project_id;
        let _guard = self.locks.lock(project_id).await;
        let existing = self.get(id).await?;

        let candidate = RelationInput {
            id: Some(id),
            project_id,
            ..input
        };
        self.admit(&candidate).await?;

        let relation = TableRelation {
            id,
            project_id,
            source_table_id: candidate.source_table_id,
            target_table_id: candidate.target_table_id,
            relation_type: candidate.relation_type,
            description: candidate.description,
            column_mappings: candidate.column_mappings,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        self.store.update(&relation).await?;

        tracing::info!(relation_id = %id, "Relation updated");
        Ok(relation)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RelationError> {
        if !self.store.delete(id).await? {
            return Err(RelationError::NotFound(id));
        }
        tracing::info!(relation_id = %id, "Relation deleted");
        Ok(())
    }

    /// Create relations one by one, stopping at the first failure.
    ///
    /// Relations created before the failure are kept.
    pub async fn create_many(
        &self,
        inputs: Vec<RelationInput>,
    ) -> Result<Vec<TableRelation>, RelationError> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(self.create(input).await?);
        }
        Ok(created)
    }

    /// Remove every relation touching `table_id`
    pub async fn delete_by_table(&self, table_id: Uuid) -> Result<u64, RelationError> {
        let removed = self.store.delete_by_table(table_id).await?;
        if removed > 0 {
            tracing::info!(table_id = %table_id, removed, "Relations of table deleted");
        }
        Ok(removed)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get(&self, id: Uuid) -> Result<TableRelation, RelationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(RelationError::NotFound(id))
    }

    pub async fn get_by_project(&self, project_id: Uuid) -> Result<Vec<TableRelation>, RelationError> {
        Ok(self.store.find_by_project(project_id).await?)
    }

    pub async fn get_by_table(&self, table_id: Uuid) -> Result<Vec<TableRelation>, RelationError> {
        Ok(self.store.find_by_table(table_id).await?)
    }

    pub async fn get_between(
        &self,
        table_a: Uuid,
        table_b: Uuid,
    ) -> Result<Vec<TableRelation>, RelationError> {
        Ok(self.store.find_between(table_a, table_b).await?)
    }

    pub async fn get_by_type(
        &self,
        project_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<TableRelation>, RelationError> {
        Ok(self
            .store
            .find_by_project_and_type(project_id, relation_type)
            .await?)
    }
}
