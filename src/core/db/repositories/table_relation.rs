//! Table relation repository for database operations
//!
//! Relations live in `table_relations`; their ordered column mappings live in
//! `relation_column_mappings` and are always rewritten as a whole inside the
//! same transaction as the relation row.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::core::db::models::{ColumnMappingRow, TableRelationRow};
use crate::core::schema::{ColumnMapping, RelationType, TableRelation};
use crate::core::store::{RelationStore, StoreError};

const SELECT_RELATION: &str = r#"
    SELECT id, project_id, source_table_id, target_table_id, relation_type,
           description, created_at, updated_at
    FROM table_relations
"#;

/// PostgreSQL-backed [`RelationStore`]
#[derive(Clone)]
pub struct TableRelationRepository {
    pool: PgPool,
}

impl TableRelationRepository {
    /// Create a new relation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_mappings(
        tx: &mut Transaction<'_, Postgres>,
        relation_id: Uuid,
        mappings: &[ColumnMapping],
    ) -> Result<(), StoreError> {
        for (position, mapping) in mappings.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO relation_column_mappings
                    (relation_id, position, source_column_id, target_column_id, mapping_type)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(relation_id)
            .bind(position as i32)
            .bind(mapping.source_column_id)
            .bind(mapping.target_column_id)
            .bind(&mapping.mapping_type)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Attach mappings to relation rows, keeping row order
    async fn hydrate(&self, rows: Vec<TableRelationRow>) -> Result<Vec<TableRelation>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mapping_rows = sqlx::query_as::<_, ColumnMappingRow>(
            r#"
            SELECT relation_id, position, source_column_id, target_column_id, mapping_type
            FROM relation_column_mappings
            WHERE relation_id = ANY($1)
            ORDER BY relation_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut mappings: HashMap<Uuid, Vec<ColumnMapping>> = HashMap::new();
        for row in mapping_rows {
            mappings.entry(row.relation_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let own = mappings.remove(&row.id).unwrap_or_default();
                row.into_relation(own).map_err(StoreError::from)
            })
            .collect()
    }

    async fn fetch_many(
        &self,
        filter: &str,
        first: Uuid,
        second: Option<Uuid>,
    ) -> Result<Vec<TableRelation>, StoreError> {
        let sql = format!("{} {} ORDER BY created_at ASC, id ASC", SELECT_RELATION, filter);
        let mut query = sqlx::query_as::<_, TableRelationRow>(&sql).bind(first);
        if let Some(second) = second {
            query = query.bind(second);
        }

        let rows = query.fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }
}

#[async_trait]
impl RelationStore for TableRelationRepository {
    async fn insert(&self, relation: &TableRelation) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO table_relations (
                id, project_id, source_table_id, target_table_id, relation_type,
                description, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(relation.id)
        .bind(relation.project_id)
        .bind(relation.source_table_id)
        .bind(relation.target_table_id)
        .bind(relation.relation_type.as_str())
        .bind(&relation.description)
        .bind(relation.created_at)
        .bind(relation.updated_at)
        .execute(&mut *tx)
        .await?;

        Self::insert_mappings(&mut tx, relation.id, &relation.column_mappings).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn update(&self, relation: &TableRelation) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE table_relations
            SET source_table_id = $2, target_table_id = $3, relation_type = $4,
                description = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(relation.id)
        .bind(relation.source_table_id)
        .bind(relation.target_table_id)
        .bind(relation.relation_type.as_str())
        .bind(&relation.description)
        .bind(relation.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(relation.id));
        }

        sqlx::query("DELETE FROM relation_column_mappings WHERE relation_id = $1")
            .bind(relation.id)
            .execute(&mut *tx)
            .await?;
        Self::insert_mappings(&mut tx, relation.id, &relation.column_mappings).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM table_relations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_table(&self, table_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM table_relations WHERE source_table_id = $1 OR target_table_id = $1",
        )
        .bind(table_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TableRelation>, StoreError> {
        let relations = self.fetch_many("WHERE id = $1", id, None).await?;
        Ok(relations.into_iter().next())
    }

    async fn find_by_project(&self, project_id: Uuid) -> Result<Vec<TableRelation>, StoreError> {
        self.fetch_many("WHERE project_id = $1", project_id, None).await
    }

    async fn find_by_table(&self, table_id: Uuid) -> Result<Vec<TableRelation>, StoreError> {
        self.fetch_many(
            "WHERE source_table_id = $1 OR target_table_id = $1",
            table_id,
            None,
        )
        .await
    }

    async fn find_between(
        &self,
        table_a: Uuid,
        table_b: Uuid,
    ) -> Result<Vec<TableRelation>, StoreError> {
        self.fetch_many(
            "WHERE (source_table_id = $1 AND target_table_id = $2) \
             OR (source_table_id = $2 AND target_table_id = $1)",
            table_a,
            Some(table_b),
        )
        .await
    }

    async fn find_by_project_and_type(
        &self,
        project_id: Uuid,
        relation_type: RelationType,
    ) -> Result<Vec<TableRelation>, StoreError> {
        let sql = format!(
            "{} WHERE project_id = $1 AND relation_type = $2 ORDER BY created_at ASC, id ASC",
            SELECT_RELATION
        );
        let rows = sqlx::query_as::<_, TableRelationRow>(&sql)
            .bind(project_id)
            .bind(relation_type.as_str())
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::{DbConfig, create_pool_with_migrations};
    use chrono::Utc;

    async fn repository() -> TableRelationRepository {
        let config = DbConfig::from_env().expect("DATABASE_URL must be set");
        let pool = create_pool_with_migrations(&config).await.expect("pool");
        TableRelationRepository::new(pool)
    }

    fn mapping(kind: &str) -> ColumnMapping {
        ColumnMapping {
            source_column_id: Uuid::new_v4(),
            target_column_id: Uuid::new_v4(),
            mapping_type: kind.into(),
        }
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_mappings_are_replaced_on_update() {
        let repo = repository().await;
        let now = Utc::now();
        let mut relation = TableRelation {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            source_table_id: Uuid::new_v4(),
            target_table_id: Uuid::new_v4(),
            relation_type: RelationType::OneToMany,
            description: None,
            column_mappings: vec![mapping("FK"), mapping("FK")],
            created_at: now,
            updated_at: now,
        };

        repo.insert(&relation).await.unwrap();
        let stored = repo.find_by_id(relation.id).await.unwrap().unwrap();
        assert_eq!(stored.column_mappings, relation.column_mappings);

        relation.column_mappings = vec![mapping("REF")];
        repo.update(&relation).await.unwrap();
        let stored = repo.find_by_id(relation.id).await.unwrap().unwrap();
        assert_eq!(stored.column_mappings, relation.column_mappings);

        assert_eq!(repo.delete_by_table(relation.source_table_id).await.unwrap(), 1);
    }
}
