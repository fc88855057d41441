//! Table design repository for database operations

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use crate::core::db::models::TableDesignRow;
use crate::core::schema::TableDesign;
use crate::core::store::{StoreError, TableDesignStore};

const SELECT_DESIGN: &str = r#"
    SELECT id, project_id, code, display_name, comment, table_type, domain,
           columns, metadata, status, synced, synced_columns, synced_code,
           created_by, created_at, updated_at
    FROM table_designs
"#;

/// PostgreSQL-backed [`TableDesignStore`]
#[derive(Clone)]
pub struct TableDesignRepository {
    pool: PgPool,
}

impl TableDesignRepository {
    /// Create a new table design repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(
        &self,
        filter: &str,
        project_id: Option<Uuid>,
    ) -> Result<Vec<TableDesign>, StoreError> {
        let sql = format!("{} {} ORDER BY created_at ASC, id ASC", SELECT_DESIGN, filter);
        let mut query = sqlx::query_as::<_, TableDesignRow>(&sql);
        if let Some(project_id) = project_id {
            query = query.bind(project_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| TableDesign::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl TableDesignStore for TableDesignRepository {
    async fn insert(&self, design: &TableDesign) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO table_designs (
                id, project_id, code, display_name, comment, table_type, domain,
                columns, metadata, status, synced, synced_columns, synced_code,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(design.id)
        .bind(design.project_id)
        .bind(&design.code)
        .bind(&design.display_name)
        .bind(&design.comment)
        .bind(design.table_type.as_str())
        .bind(design.domain.as_str())
        .bind(design.columns.as_ref().map(Json))
        .bind(design.metadata.as_ref().map(Json))
        .bind(design.status.as_str())
        .bind(design.synced)
        .bind(design.synced_columns.as_ref().map(Json))
        .bind(&design.synced_code)
        .bind(design.created_by)
        .bind(design.created_at)
        .bind(design.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, design: &TableDesign) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE table_designs
            SET code = $2, display_name = $3, comment = $4, table_type = $5,
                domain = $6, columns = $7, metadata = $8, status = $9,
                synced = $10, synced_columns = $11, synced_code = $12, updated_at = $13
            WHERE id = $1
            "#,
        )
        .bind(design.id)
        .bind(&design.code)
        .bind(&design.display_name)
        .bind(&design.comment)
        .bind(design.table_type.as_str())
        .bind(design.domain.as_str())
        .bind(design.columns.as_ref().map(Json))
        .bind(design.metadata.as_ref().map(Json))
        .bind(design.status.as_str())
        .bind(design.synced)
        .bind(design.synced_columns.as_ref().map(Json))
        .bind(&design.synced_code)
        .bind(design.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(design.id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM table_designs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableDesign>, StoreError> {
        let sql = format!("{} WHERE id = $1", SELECT_DESIGN);
        let row = sqlx::query_as::<_, TableDesignRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TableDesign::try_from).transpose()?)
    }

    async fn find_by_code(
        &self,
        project_id: Uuid,
        code: &str,
    ) -> Result<Option<TableDesign>, StoreError> {
        let sql = format!("{} WHERE project_id = $1 AND code = $2", SELECT_DESIGN);
        let row = sqlx::query_as::<_, TableDesignRow>(&sql)
            .bind(project_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TableDesign::try_from).transpose()?)
    }

    async fn list(&self) -> Result<Vec<TableDesign>, StoreError> {
        self.fetch_many("", None).await
    }

    async fn list_by_project(&self, project_id: Uuid) -> Result<Vec<TableDesign>, StoreError> {
        self.fetch_many("WHERE project_id = $1", Some(project_id)).await
    }

    async fn list_unsynced(&self) -> Result<Vec<TableDesign>, StoreError> {
        self.fetch_many("WHERE synced = FALSE", None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{DbConfig, create_pool_with_migrations};
    use crate::core::schema::{DataType, DesignStatus, Domain, Field, ColumnSet, TableType};
    use chrono::Utc;

    async fn repository() -> TableDesignRepository {
        let config = DbConfig::from_env().expect("DATABASE_URL must be set");
        let pool = create_pool_with_migrations(&config).await.expect("pool");
        TableDesignRepository::new(pool)
    }

    fn design(project_id: Uuid) -> TableDesign {
        let now = Utc::now();
        TableDesign {
            id: Uuid::new_v4(),
            project_id,
            code: "users".into(),
            display_name: "Users".into(),
            comment: Some("accounts".into()),
            table_type: TableType::Table,
            domain: Domain::Business,
            columns: Some(ColumnSet::new().add_field(Field::new("id", DataType::Int).primary_key())),
            metadata: None,
            status: DesignStatus::Draft,
            synced: false,
            synced_columns: None,
            synced_code: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_design_lifecycle() {
        let repo = repository().await;
        let project = Uuid::new_v4();
        let mut d = design(project);

        repo.insert(&d).await.unwrap();
        let found = repo.find_by_code(project, "users").await.unwrap().unwrap();
        assert_eq!(found.columns, d.columns);

        d.synced = true;
        d.synced_columns = d.columns.clone();
        d.synced_code = Some(d.code.clone());
        repo.update(&d).await.unwrap();
        let stored = repo.find_by_id(d.id).await.unwrap().unwrap();
        assert!(stored.synced);
        assert_eq!(stored.synced_code.as_deref(), Some("users"));
        assert_eq!(repo.list_by_project(project).await.unwrap().len(), 1);

        assert!(repo.delete(d.id).await.unwrap());
        assert!(matches!(repo.update(&d).await, Err(StoreError::NotFound(_))));
    }
}
