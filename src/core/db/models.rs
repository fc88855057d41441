//! Database models for the metadata store
//!
//! Row structs mapping the PostgreSQL tables created by the migrations. Enum
//! columns are stored as their upper-case text form; column sets and metadata
//! are JSONB documents.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::core::schema::{
    ColumnMapping, ColumnSet, Metadata, ParseEnumError, TableDesign, TableRelation,
};

// ============================================================================
// Table Design Model
// ============================================================================

/// Row of `table_designs`
#[derive(Debug, Clone, FromRow)]
pub struct TableDesignRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub code: String,
    pub display_name: String,
    pub comment: Option<String>,
    pub table_type: String,
    pub domain: String,
    pub columns: Option<Json<ColumnSet>>,
    pub metadata: Option<Json<Metadata>>,
    pub status: String,
    pub synced: bool,
    pub synced_columns: Option<Json<ColumnSet>>,
    pub synced_code: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TableDesignRow> for TableDesign {
    type Error = ParseEnumError;

    fn try_from(row: TableDesignRow) -> Result<Self, Self::Error> {
        Ok(TableDesign {
            id: row.id,
            project_id: row.project_id,
            code: row.code,
            display_name: row.display_name,
            comment: row.comment,
            table_type: row.table_type.parse()?,
            domain: row.domain.parse()?,
            columns: row.columns.map(|Json(c)| c),
            metadata: row.metadata.map(|Json(m)| m),
            status: row.status.parse()?,
            synced: row.synced,
            synced_columns: row.synced_columns.map(|Json(c)| c),
            synced_code: row.synced_code,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================================================
// Relation Models
// ============================================================================

/// Row of `table_relations`; mappings are loaded separately
#[derive(Debug, Clone, FromRow)]
pub struct TableRelationRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source_table_id: Uuid,
    pub target_table_id: Uuid,
    pub relation_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableRelationRow {
    pub fn into_relation(
        self,
        column_mappings: Vec<ColumnMapping>,
    ) -> Result<TableRelation, ParseEnumError> {
        Ok(TableRelation {
            id: self.id,
            project_id: self.project_id,
            source_table_id: self.source_table_id,
            target_table_id: self.target_table_id,
            relation_type: self.relation_type.parse()?,
            description: self.description,
            column_mappings,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row of `relation_column_mappings`
#[derive(Debug, Clone, FromRow)]
pub struct ColumnMappingRow {
    pub relation_id: Uuid,
    pub position: i32,
    pub source_column_id: Uuid,
    pub target_column_id: Uuid,
    pub mapping_type: String,
}

impl From<ColumnMappingRow> for ColumnMapping {
    fn from(row: ColumnMappingRow) -> Self {
        ColumnMapping {
            source_column_id: row.source_column_id,
            target_column_id: row.target_column_id,
            mapping_type: row.mapping_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{DataType, DesignStatus, Domain, Field, RelationType, TableType};

    fn design_row() -> TableDesignRow {
        let now = Utc::now();
        TableDesignRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            code: "users".into(),
            display_name: "Users".into(),
            comment: None,
            table_type: "VIEW".into(),
            domain: "SYSTEM".into(),
            columns: Some(Json(ColumnSet::new().add_field(Field::new("id", DataType::Int)))),
            metadata: None,
            status: "ACTIVE".into(),
            synced: true,
            synced_columns: None,
            synced_code: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_design_row_converts() {
        let design = TableDesign::try_from(design_row()).unwrap();
        assert_eq!(design.table_type, TableType::View);
        assert_eq!(design.domain, Domain::System);
        assert_eq!(design.status, DesignStatus::Active);
        assert_eq!(design.fields().len(), 1);
    }

    #[test]
    fn test_design_row_with_unknown_status_fails() {
        let mut row = design_row();
        row.status = "DELETED".into();
        let err = TableDesign::try_from(row).unwrap_err();
        assert_eq!(err.value, "DELETED");
    }

    #[test]
    fn test_relation_row_keeps_mappings() {
        let now = Utc::now();
        let row = TableRelationRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            source_table_id: Uuid::new_v4(),
            target_table_id: Uuid::new_v4(),
            relation_type: "MANY_TO_MANY".into(),
            description: Some("tags".into()),
            created_at: now,
            updated_at: now,
        };
        let mapping = ColumnMapping::from(ColumnMappingRow {
            relation_id: row.id,
            position: 0,
            source_column_id: Uuid::new_v4(),
            target_column_id: Uuid::new_v4(),
            mapping_type: "FK".into(),
        });

        let relation = row.into_relation(vec![mapping.clone()]).unwrap();
        assert_eq!(relation.relation_type, RelationType::ManyToMany);
        assert_eq!(relation.column_mappings, vec![mapping]);
    }
}
