//! Table design registry
//!
//! Lifecycle of table designs: CRUD with validation, synchronization into the
//! target database through a [`DdlExecutor`], and DDL previews/exports.
//!
//! A design's state moves DRAFT → ACTIVE (with `synced = true`) after its first
//! successful sync; any change to its columns or its code flips `synced` back to
//! false. The column set and code captured at the last successful sync decide
//! whether the next sync issues CREATE or ALTER, and which table it targets.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::ddl::{DdlError, DdlGenerator};
use super::executor::{DdlExecutor, ExecutorError};
use super::locks::ProjectLocks;
use super::relations::{LookupError, TableLookup};
use super::schema::{ColumnSet, DesignStatus, TableDesign, TableDesignInput};
use super::store::{StoreError, TableDesignStore};
use super::validation::{SchemaValidator, ValidationError};

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Table design not found: {0}")]
    NotFound(Uuid),

    #[error("Table code '{code}' already exists in project {project_id}")]
    DuplicateCode { project_id: Uuid, code: String },

    #[error("Failed to sync table '{table}': {source}")]
    SyncFailed {
        table: String,
        #[source]
        source: SyncError,
    },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Why a sync or export could not produce or apply its DDL
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("DDL generation failed: {0}")]
    Generation(#[from] DdlError),

    #[error("DDL execution failed: {0}")]
    Execution(#[from] ExecutorError),
}

/// Statement a sync of a design would issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Create,
    Alter,
    /// Columns match the last synced snapshot
    None,
}

/// DDL a design would be synced with, or why it cannot be generated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DdlPreview {
    pub table_id: Uuid,
    pub code: String,
    pub kind: StatementKind,
    pub ddl: String,
    pub error: Option<String>,
}

impl DdlPreview {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-table result inside a [`SyncReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub table_id: Uuid,
    pub code: String,
    pub error: Option<String>,
}

/// Result of a batch sync
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub synced: Vec<SyncOutcome>,
    pub failed: Vec<SyncOutcome>,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.synced.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry of table designs backed by a [`TableDesignStore`]
pub struct TableRegistry {
    store: Arc<dyn TableDesignStore>,
    executor: Arc<dyn DdlExecutor>,
    validator: SchemaValidator,
    locks: ProjectLocks,
}

impl TableRegistry {
    pub fn new(store: Arc<dyn TableDesignStore>, executor: Arc<dyn DdlExecutor>) -> Self {
        Self {
            store,
            executor,
            validator: SchemaValidator::new(),
            locks: ProjectLocks::new(),
        }
    }

    /// Locks guarding this registry's per-project check-then-write sequences
    pub fn locks(&self) -> &ProjectLocks {
        &self.locks
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Validate and store a new design as an unsynced DRAFT
    pub async fn create(&self, input: TableDesignInput) -> Result<TableDesign, RegistryError> {
        let validated = self.validator.validate(&input)?;

        let _guard = self.locks.lock(input.project_id).await;
        if self
            .store
            .find_by_code(input.project_id, &input.code)
            .await?
            .is_some()
        {
            return Err(RegistryError::DuplicateCode {
                project_id: input.project_id,
                code: input.code,
            });
        }

        let now = Utc::now();
        let design = TableDesign {
            id: Uuid::new_v4(),
            project_id: input.project_id,
            code: input.code,
            display_name: input.display_name,
            comment: input.comment,
            table_type: input.table_type,
            domain: input.domain,
            columns: validated.columns,
            metadata: validated.metadata,
            status: DesignStatus::Draft,
            synced: false,
            synced_columns: None,
            synced_code: None,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&design).await?;

        tracing::info!(
            table_id = %design.id,
            project_id = %design.project_id,
            code = %design.code,
            "Table design created"
        );
        Ok(design)
    }

    pub async fn get(&self, id: Uuid) -> Result<TableDesign, RegistryError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<TableDesign>, RegistryError> {
        Ok(self.store.list().await?)
    }

    pub async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<TableDesign>, RegistryError> {
        Ok(self.store.list_by_project(project_id).await?)
    }

    /// Overwrite the mutable fields of a design.
    ///
    /// The project a design belongs to never changes. A column or code change
    /// resets `synced`; anything else leaves it alone.
    pub async fn update(
        &self,
        id: Uuid,
        input: TableDesignInput,
    ) -> Result<TableDesign, RegistryError> {
        let validated = self.validator.validate(&input)?;

        let project_id = self.get(id).await?.project_id;
        let _guard = self.locks.lock(project_id).await;
        let mut design = self.get(id).await?;

        if design.code != input.code
            && self
                .store
                .find_by_code(project_id, &input.code)
                .await?
                .is_some_and(|other| other.id != id)
        {
            return Err(RegistryError::DuplicateCode {
                project_id,
                code: input.code,
            });
        }

        let columns_changed = design.columns != validated.columns;
        let code_changed = design.code != input.code;

        design.code = input.code;
        design.display_name = input.display_name;
        design.comment = input.comment;
        design.table_type = input.table_type;
        design.domain = input.domain;
        design.columns = validated.columns;
        design.metadata = validated.metadata;
        if let Some(status) = input.status {
            design.status = status;
        }
        if columns_changed || code_changed {
            design.synced = false;
        }
        design.updated_at = Utc::now();

        self.store.update(&design).await?;

        tracing::info!(
            table_id = %design.id,
            code = %design.code,
            columns_changed,
            code_changed,
            "Table design updated"
        );
        Ok(design)
    }

    pub async fn delete(&self, id: Uuid) -> Result<TableDesign, RegistryError> {
        let project_id = self.get(id).await?.project_id;
        let _guard = self.locks.lock(project_id).await;
        self.delete_locked(id).await
    }

    /// Delete while the caller holds the design's project lock
    pub(crate) async fn delete_locked(&self, id: Uuid) -> Result<TableDesign, RegistryError> {
        let design = self.get(id).await?;
        if !self.store.delete(id).await? {
            return Err(RegistryError::NotFound(id));
        }

        tracing::info!(table_id = %id, code = %design.code, "Table design deleted");
        Ok(design)
    }

    // ========================================================================
    // Synchronization
    // ========================================================================

    /// Statement that brings the target database in line with `design`
    fn plan(design: &TableDesign) -> Result<(StatementKind, String), DdlError> {
        match &design.synced_columns {
            None => Ok((StatementKind::Create, DdlGenerator::generate_create(design)?)),
            Some(snapshot) => {
                let empty = ColumnSet::default();
                let current = design.columns.as_ref().unwrap_or(&empty);
                let live_code = design.live_code();
                let mut ddl = DdlGenerator::generate_alter_columns(
                    live_code,
                    design.dialect(),
                    snapshot,
                    current,
                )?;
                if live_code != design.code {
                    if !ddl.is_empty() {
                        ddl.push('\n');
                    }
                    ddl.push_str(&DdlGenerator::generate_rename(
                        live_code,
                        &design.code,
                        design.dialect(),
                    ));
                }
                let kind = if ddl.is_empty() {
                    StatementKind::None
                } else {
                    StatementKind::Alter
                };
                Ok((kind, ddl))
            }
        }
    }

    /// Generate and execute the DDL for one design, then mark it synced.
    ///
    /// On failure the stored design is left untouched.
    pub async fn sync_to_database(&self, id: Uuid) -> Result<TableDesign, RegistryError> {
        let project_id = self.get(id).await?.project_id;
        let _guard = self.locks.lock(project_id).await;
        let mut design = self.get(id).await?;

        self.validator.validate_for_sync(&design)?;

        let failed = |source: SyncError| RegistryError::SyncFailed {
            table: design.code.clone(),
            source,
        };

        let (kind, ddl) = Self::plan(&design).map_err(|e| failed(e.into()))?;

        if kind == StatementKind::None {
            tracing::info!(table_id = %id, code = %design.code, "No column changes, nothing to execute");
        } else {
            tracing::debug!(table_id = %id, kind = ?kind, ddl = %ddl, "Executing DDL");
            if let Err(e) = self.executor.execute(&ddl).await {
                tracing::error!(table_id = %id, code = %design.code, error = %e, "DDL execution failed");
                return Err(failed(e.into()));
            }
        }

        design.synced = true;
        design.synced_columns = design.columns.clone();
        design.synced_code = Some(design.code.clone());
        if design.status == DesignStatus::Draft {
            design.status = DesignStatus::Active;
        }
        design.updated_at = Utc::now();
        self.store.update(&design).await?;

        tracing::info!(table_id = %id, code = %design.code, kind = ?kind, "Table design synced");
        Ok(design)
    }

    /// Sync every unsynced design one after another.
    ///
    /// A failing table is recorded in the report and the batch moves on.
    pub async fn sync_all(&self) -> Result<SyncReport, RegistryError> {
        let pending = self.store.list_unsynced().await?;
        tracing::info!(count = pending.len(), "Starting batch sync");

        let mut report = SyncReport::default();
        for design in pending {
            match self.sync_to_database(design.id).await {
                Ok(_) => report.synced.push(SyncOutcome {
                    table_id: design.id,
                    code: design.code,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(table_id = %design.id, code = %design.code, error = %e, "Table sync failed");
                    report.failed.push(SyncOutcome {
                        table_id: design.id,
                        code: design.code,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        tracing::info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            "Batch sync finished"
        );
        Ok(report)
    }

    // ========================================================================
    // Preview and Export
    // ========================================================================

    fn preview(design: &TableDesign) -> DdlPreview {
        let (kind, ddl, error) = match Self::plan(design) {
            Ok((kind, ddl)) => (kind, ddl, None),
            Err(e) => (StatementKind::None, String::new(), Some(e.to_string())),
        };
        DdlPreview {
            table_id: design.id,
            code: design.code.clone(),
            kind,
            ddl,
            error,
        }
    }

    /// DDL the next sync of `id` would execute, without executing it
    pub async fn preview_ddl(&self, id: Uuid) -> Result<DdlPreview, RegistryError> {
        let design = self.get(id).await?;
        Ok(Self::preview(&design))
    }

    /// Previews for every design, failures included
    pub async fn preview_all_ddl(&self) -> Result<Vec<DdlPreview>, RegistryError> {
        let designs = self.store.list().await?;
        Ok(designs.iter().map(Self::preview).collect())
    }

    /// CREATE script for the given designs, in the given order
    pub async fn export_ddl(&self, ids: &[Uuid]) -> Result<String, RegistryError> {
        let mut scripts = Vec::with_capacity(ids.len());
        for &id in ids {
            let design = self.get(id).await?;
            let ddl = DdlGenerator::generate_create(&design).map_err(|e| {
                RegistryError::SyncFailed {
                    table: design.code.clone(),
                    source: e.into(),
                }
            })?;
            scripts.push(ddl);
        }
        Ok(scripts.join("\n\n"))
    }
}

#[async_trait]
impl TableLookup for TableRegistry {
    async fn get_by_id(&self, id: Uuid) -> Result<TableDesign, LookupError> {
        match self.store.find_by_id(id).await {
            Ok(Some(design)) => Ok(design),
            Ok(None) => Err(LookupError::NotFound(id)),
            Err(e) => Err(LookupError::Store(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::executor::DryRunExecutor;
    use crate::core::store::InMemoryTableDesignStore;
    use serde_json::{Value, json};

    struct FailingExecutor;

    #[async_trait]
    impl DdlExecutor for FailingExecutor {
        async fn execute(&self, _ddl: &str) -> Result<(), ExecutorError> {
            Err(ExecutorError::Rejected("permission denied".into()))
        }
    }

    fn registry() -> (TableRegistry, Arc<DryRunExecutor>) {
        let executor = Arc::new(DryRunExecutor::new());
        let registry = TableRegistry::new(Arc::new(InMemoryTableDesignStore::new()), executor.clone());
        (registry, executor)
    }

    fn users_columns(email_length: u32) -> Value {
        json!({
            "fields": [
                {"name": "id", "displayName": "ID", "dataType": "INT", "primaryKey": true},
                {"name": "email", "displayName": "Email", "dataType": "VARCHAR",
                 "length": email_length, "nullable": false}
            ],
            "indexes": []
        })
    }

    fn users_input(project: Uuid) -> TableDesignInput {
        TableDesignInput::new(project, "users", "Users").with_columns(users_columns(255))
    }

    // ========================================================================
    // CRUD Tests
    // ========================================================================

    #[tokio::test]
    async fn test_create_assigns_draft_state() {
        let (registry, _) = registry();
        let design = registry
            .create(users_input(Uuid::new_v4()).with_status(DesignStatus::Active))
            .await
            .unwrap();

        assert_eq!(design.status, DesignStatus::Draft);
        assert!(!design.synced);
        assert!(design.synced_columns.is_none());
        assert_eq!(registry.get(design.id).await.unwrap(), design);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_code_in_project() {
        let (registry, _) = registry();
        let project = Uuid::new_v4();
        registry.create(users_input(project)).await.unwrap();

        let err = registry.create(users_input(project)).await.unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCode { ref code, .. } if code == "users"));

        registry.create(users_input(Uuid::new_v4())).await.unwrap();
        assert_eq!(registry.list().await.unwrap().len(), 2);
        assert_eq!(registry.list_by_project(project).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_codes_unique() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);
        let project = Uuid::new_v4();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.create(users_input(project)).await })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let (registry, _) = registry();
        let input = TableDesignInput::new(Uuid::new_v4(), "users", "Users").with_columns(json!({
            "fields": [{"name": "email", "displayName": "Email", "dataType": "VARCHAR"}],
            "indexes": []
        }));

        let err = registry.create(input).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref e) if e.field == "columns.fields[0].length"));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_design() {
        let (registry, _) = registry();
        let err = registry
            .update(Uuid::new_v4(), users_input(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_code_to_existing_code_fails() {
        let (registry, _) = registry();
        let project = Uuid::new_v4();
        registry.create(users_input(project)).await.unwrap();
        let orders = registry
            .create(TableDesignInput::new(project, "orders", "Orders").with_columns(users_columns(10)))
            .await
            .unwrap();

        let err = registry
            .update(orders.id, users_input(project))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateCode { .. }));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (registry, _) = registry();
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();

        registry.delete(design.id).await.unwrap();
        assert!(matches!(registry.get(design.id).await, Err(RegistryError::NotFound(_))));
        assert!(matches!(registry.delete(design.id).await, Err(RegistryError::NotFound(_))));
    }

    // ========================================================================
    // Sync Tests
    // ========================================================================

    #[tokio::test]
    async fn test_first_sync_creates_and_activates() {
        let (registry, executor) = registry();
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();

        let synced = registry.sync_to_database(design.id).await.unwrap();
        assert!(synced.synced);
        assert_eq!(synced.status, DesignStatus::Active);
        assert_eq!(synced.synced_columns, synced.columns);

        let executed = executor.executed().await;
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("CREATE TABLE users"));
    }

    #[tokio::test]
    async fn test_archived_design_stays_archived_after_sync() {
        let (registry, _) = registry();
        let project = Uuid::new_v4();
        let design = registry.create(users_input(project)).await.unwrap();
        registry
            .update(design.id, users_input(project).with_status(DesignStatus::Archived))
            .await
            .unwrap();

        let synced = registry.sync_to_database(design.id).await.unwrap();
        assert_eq!(synced.status, DesignStatus::Archived);
        assert!(synced.synced);
    }

    #[tokio::test]
    async fn test_resync_without_changes_executes_nothing() {
        let (registry, executor) = registry();
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();
        registry.sync_to_database(design.id).await.unwrap();
        registry.sync_to_database(design.id).await.unwrap();

        assert_eq!(executor.executed().await.len(), 1);
        let preview = registry.preview_ddl(design.id).await.unwrap();
        assert_eq!(preview.kind, StatementKind::None);
        assert!(preview.ddl.is_empty());
    }

    #[tokio::test]
    async fn test_sync_without_columns_is_validation_error() {
        let (registry, executor) = registry();
        let design = registry
            .create(TableDesignInput::new(Uuid::new_v4(), "empty", "Empty"))
            .await
            .unwrap();

        let err = registry.sync_to_database(design.id).await.unwrap_err();
        assert!(matches!(err, RegistryError::Validation(ref e) if e.field == "columns"));
        assert!(executor.executed().await.is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_leaves_design_untouched() {
        let store = Arc::new(InMemoryTableDesignStore::new());
        let registry = TableRegistry::new(store, Arc::new(FailingExecutor));
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();

        let err = registry.sync_to_database(design.id).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::SyncFailed { ref table, source: SyncError::Execution(_) } if table == "users"
        ));
        assert_eq!(registry.get(design.id).await.unwrap(), design);
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_design_untouched() {
        let (registry, executor) = registry();
        let project = Uuid::new_v4();
        let sqlite = json!({
            "dbType": "SQLITE",
            "engine": "InnoDB",
            "charset": "utf8mb4",
            "collate": "utf8mb4_general_ci"
        });
        let design = registry
            .create(users_input(project).with_metadata(sqlite.clone()))
            .await
            .unwrap();
        registry.sync_to_database(design.id).await.unwrap();

        // SQLite cannot modify a column in place
        let widened = registry
            .update(
                design.id,
                TableDesignInput::new(project, "users", "Users")
                    .with_columns(users_columns(320))
                    .with_metadata(sqlite),
            )
            .await
            .unwrap();
        assert!(!widened.synced);

        let err = registry.sync_to_database(design.id).await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::SyncFailed { ref table, source: SyncError::Generation(_) } if table == "users"
        ));
        assert_eq!(registry.get(design.id).await.unwrap(), widened);
        assert_eq!(executor.executed().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_unknown_design() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.sync_to_database(Uuid::new_v4()).await,
            Err(RegistryError::NotFound(_))
        ));
    }

    // ========================================================================
    // Preview and Export Tests
    // ========================================================================

    #[tokio::test]
    async fn test_preview_all_records_failures() {
        let (registry, executor) = registry();
        let project = Uuid::new_v4();
        registry.create(users_input(project)).await.unwrap();
        registry
            .create(TableDesignInput::new(project, "empty", "Empty"))
            .await
            .unwrap();

        let previews = registry.preview_all_ddl().await.unwrap();
        assert_eq!(previews.len(), 2);
        assert!(previews[0].is_ok());
        assert_eq!(previews[0].kind, StatementKind::Create);
        assert!(!previews[1].is_ok());
        assert!(executor.executed().await.is_empty());
    }

    #[tokio::test]
    async fn test_preview_serializes_camel_case() {
        let (registry, _) = registry();
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();
        let value = serde_json::to_value(registry.preview_ddl(design.id).await.unwrap()).unwrap();

        assert_eq!(value["tableId"], json!(design.id));
        assert_eq!(value["kind"], json!("CREATE"));
        assert_eq!(value["error"], Value::Null);
    }

    #[tokio::test]
    async fn test_export_keeps_requested_order() {
        let (registry, _) = registry();
        let project = Uuid::new_v4();
        let users = registry.create(users_input(project)).await.unwrap();
        let orders = registry
            .create(TableDesignInput::new(project, "orders", "Orders").with_columns(users_columns(64)))
            .await
            .unwrap();

        let script = registry.export_ddl(&[orders.id, users.id]).await.unwrap();
        let orders_at = script.find("CREATE TABLE orders").unwrap();
        let users_at = script.find("CREATE TABLE users").unwrap();
        assert!(orders_at < users_at);

        assert!(matches!(
            registry.export_ddl(&[Uuid::new_v4()]).await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_registry_is_a_table_lookup() {
        let (registry, _) = registry();
        let design = registry.create(users_input(Uuid::new_v4())).await.unwrap();

        assert_eq!(registry.get_by_id(design.id).await.unwrap().id, design.id);
        assert!(matches!(
            registry.get_by_id(Uuid::new_v4()).await,
            Err(LookupError::NotFound(_))
        ));
    }
}
