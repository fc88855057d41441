//! Typed model of table designs, their column sets and the relations between them.
//!
//! Column and metadata documents arrive as free-form JSON; `validation` turns them
//! into the types below once, and everything downstream works on the typed form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a string does not name a member of one of the fixed enumerations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Column Data Types
// ============================================================================

/// Column data type from the fixed set the modeler supports
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Int,
    BigInt,
    SmallInt,
    TinyInt,
    VarChar,
    Char,
    Text,
    LongText,
    Decimal,
    Numeric,
    Float,
    Double,
    Date,
    DateTime,
    Timestamp,
    Binary,
    VarBinary,
    Blob,
    LongBlob,
    Boolean,
    Enum,
    Set,
}

impl DataType {
    pub const ALL: [DataType; 22] = [
        DataType::Int,
        DataType::BigInt,
        DataType::SmallInt,
        DataType::TinyInt,
        DataType::VarChar,
        DataType::Char,
        DataType::Text,
        DataType::LongText,
        DataType::Decimal,
        DataType::Numeric,
        DataType::Float,
        DataType::Double,
        DataType::Date,
        DataType::DateTime,
        DataType::Timestamp,
        DataType::Binary,
        DataType::VarBinary,
        DataType::Blob,
        DataType::LongBlob,
        DataType::Boolean,
        DataType::Enum,
        DataType::Set,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Int => "INT",
            DataType::BigInt => "BIGINT",
            DataType::SmallInt => "SMALLINT",
            DataType::TinyInt => "TINYINT",
            DataType::VarChar => "VARCHAR",
            DataType::Char => "CHAR",
            DataType::Text => "TEXT",
            DataType::LongText => "LONGTEXT",
            DataType::Decimal => "DECIMAL",
            DataType::Numeric => "NUMERIC",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Date => "DATE",
            DataType::DateTime => "DATETIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Binary => "BINARY",
            DataType::VarBinary => "VARBINARY",
            DataType::Blob => "BLOB",
            DataType::LongBlob => "LONGBLOB",
            DataType::Boolean => "BOOLEAN",
            DataType::Enum => "ENUM",
            DataType::Set => "SET",
        }
    }

    /// Types rendered as `TYPE(length)` and rejected without a positive length
    pub fn requires_length(&self) -> bool {
        matches!(
            self,
            DataType::VarChar | DataType::Char | DataType::Binary | DataType::VarBinary
        )
    }

    /// Types rendered as `TYPE(precision,scale)` and rejected without a precision
    pub fn requires_precision(&self) -> bool {
        matches!(self, DataType::Decimal | DataType::Numeric)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| ParseEnumError::new("data type", s))
    }
}

/// Kind of an index declared on a table
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    Primary,
    Unique,
    Index,
    Fulltext,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Primary => "PRIMARY",
            IndexType::Unique => "UNIQUE",
            IndexType::Index => "INDEX",
            IndexType::Fulltext => "FULLTEXT",
        }
    }
}

impl FromStr for IndexType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRIMARY" => Ok(IndexType::Primary),
            "UNIQUE" => Ok(IndexType::Unique),
            "INDEX" => Ok(IndexType::Index),
            "FULLTEXT" => Ok(IndexType::Fulltext),
            _ => Err(ParseEnumError::new("index type", s)),
        }
    }
}

// ============================================================================
// Column Set
// ============================================================================

fn default_nullable() -> bool {
    true
}

/// One column of a table design
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub display_name: String,
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Names of the indexes this column participates in
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            data_type,
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            primary_key: false,
            default_value: None,
            comment: None,
            indexes: Vec::new(),
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn decimal(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn in_index(mut self, index: impl Into<String>) -> Self {
        self.indexes.push(index.into());
        self
    }

    /// True when both fields would render to the same column definition.
    ///
    /// Display name, primary-key flag and index membership are not part of the
    /// column definition and are ignored.
    pub fn same_definition(&self, other: &Field) -> bool {
        self.data_type == other.data_type
            && self.nullable == other.nullable
            && self.length == other.length
            && self.precision == other.precision
            && self.scale == other.scale
            && self.default_value == other.default_value
            && self.comment == other.comment
    }
}

/// A named index over one or more columns
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Index {
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: IndexType,
    pub columns: Vec<String>,
}

impl Index {
    pub fn new<I, S>(name: impl Into<String>, index_type: IndexType, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            index_type,
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parsed form of a design's `columns` document
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct ColumnSet {
    pub fields: Vec<Field>,
    pub indexes: Vec<Index>,
}

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn add_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.as_str())
            .collect()
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Target database product of a design
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DbType {
    #[default]
    MySql,
    PostgreSql,
    Oracle,
    Sqlite,
    SqlServer,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::MySql => "MYSQL",
            DbType::PostgreSql => "POSTGRESQL",
            DbType::Oracle => "ORACLE",
            DbType::Sqlite => "SQLITE",
            DbType::SqlServer => "SQLSERVER",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MYSQL" => Ok(DbType::MySql),
            "POSTGRESQL" => Ok(DbType::PostgreSql),
            "ORACLE" => Ok(DbType::Oracle),
            "SQLITE" => Ok(DbType::Sqlite),
            "SQLSERVER" => Ok(DbType::SqlServer),
            _ => Err(ParseEnumError::new("database type", s)),
        }
    }
}

/// Engine-facing part of a design's metadata document.
///
/// Keys the engine does not interpret are kept in `extra` and written back
/// unchanged.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub db_type: DbType,
    pub engine: String,
    pub charset: String,
    pub collate: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    pub fn new(
        db_type: DbType,
        engine: impl Into<String>,
        charset: impl Into<String>,
        collate: impl Into<String>,
    ) -> Self {
        Self {
            db_type,
            engine: engine.into(),
            charset: charset.into(),
            collate: collate.into(),
            extra: serde_json::Map::new(),
        }
    }
}

// ============================================================================
// Table Design
// ============================================================================

/// Whether a design materializes as a table or a view
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TableType {
    #[default]
    Table,
    View,
}

/// Domain a design belongs to
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Domain {
    #[default]
    Business,
    System,
}

/// Lifecycle status of a design
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum DesignStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

macro_rules! impl_str_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ParseEnumError::new($kind, s)),
                }
            }
        }
    };
}

impl_str_enum!(TableType, "table type", { Table => "TABLE", View => "VIEW" });
impl_str_enum!(Domain, "domain", { Business => "BUSINESS", System => "SYSTEM" });
impl_str_enum!(DesignStatus, "status", {
    Draft => "DRAFT",
    Active => "ACTIVE",
    Archived => "ARCHIVED",
});

/// A logical table design owned by a project
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableDesign {
    pub id: Uuid,
    pub project_id: Uuid,
    pub code: String,
    pub display_name: String,
    pub comment: Option<String>,
    #[serde(rename = "type")]
    pub table_type: TableType,
    pub domain: Domain,
    pub columns: Option<ColumnSet>,
    pub metadata: Option<Metadata>,
    pub status: DesignStatus,
    pub synced: bool,
    /// Column set as it was at the last successful sync
    pub synced_columns: Option<ColumnSet>,
    /// Table code the last successful sync created or altered
    pub synced_code: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TableDesign {
    /// Dialect DDL is generated for; MySQL when the design carries no metadata
    pub fn dialect(&self) -> DbType {
        self.metadata
            .as_ref()
            .map(|m| m.db_type)
            .unwrap_or_default()
    }

    pub fn fields(&self) -> &[Field] {
        self.columns
            .as_ref()
            .map(|c| c.fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_columns(&self) -> bool {
        !self.fields().is_empty()
    }

    /// Name of the live table in the target database; the current code
    /// until the design has been synced
    pub fn live_code(&self) -> &str {
        self.synced_code.as_deref().unwrap_or(&self.code)
    }
}

/// Design data submitted by a caller for create and update.
///
/// `columns` and `metadata` stay untyped until the validator has checked them.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableDesignInput {
    pub project_id: Uuid,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "type", default)]
    pub table_type: TableType,
    #[serde(default)]
    pub domain: Domain,
    #[serde(default)]
    pub status: Option<DesignStatus>,
    #[serde(default)]
    pub columns: Option<serde_json::Value>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl TableDesignInput {
    pub fn new(project_id: Uuid, code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            project_id,
            code: code.into(),
            display_name: display_name.into(),
            comment: None,
            table_type: TableType::Table,
            domain: Domain::Business,
            status: None,
            columns: None,
            metadata: None,
            created_by: None,
        }
    }

    pub fn with_columns(mut self, columns: serde_json::Value) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_status(mut self, status: DesignStatus) -> Self {
        self.status = Some(status);
        self
    }
}

// ============================================================================
// Table Relations
// ============================================================================

/// Kind of relationship between two table designs
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
    Inheritance,
    Composition,
    Aggregation,
    Association,
}

impl_str_enum!(RelationType, "relation type", {
    OneToOne => "ONE_TO_ONE",
    OneToMany => "ONE_TO_MANY",
    ManyToOne => "MANY_TO_ONE",
    ManyToMany => "MANY_TO_MANY",
    Inheritance => "INHERITANCE",
    Composition => "COMPOSITION",
    Aggregation => "AGGREGATION",
    Association => "ASSOCIATION",
});

/// Pairing of a source column with a target column inside a relation
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub source_column_id: Uuid,
    pub target_column_id: Uuid,
    pub mapping_type: String,
}

/// A stored directed edge `source -> target` in a project's relation graph
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableRelation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub source_table_id: Uuid,
    pub target_table_id: Uuid,
    pub relation_type: RelationType,
    pub description: Option<String>,
    pub column_mappings: Vec<ColumnMapping>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relation data submitted for create and update.
///
/// `id` is `None` for a relation that has not been stored yet.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelationInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub project_id: Uuid,
    pub source_table_id: Uuid,
    pub target_table_id: Uuid,
    pub relation_type: RelationType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
}

impl RelationInput {
    pub fn new(
        project_id: Uuid,
        source_table_id: Uuid,
        target_table_id: Uuid,
        relation_type: RelationType,
    ) -> Self {
        Self {
            id: None,
            project_id,
            source_table_id,
            target_table_id,
            relation_type,
            description: None,
            column_mappings: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.column_mappings.push(mapping);
        self
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

impl From<&TableRelation> for RelationInput {
    fn from(relation: &TableRelation) -> Self {
        Self {
            id: Some(relation.id),
            project_id: relation.project_id,
            source_table_id: relation.source_table_id,
            target_table_id: relation.target_table_id,
            relation_type: relation.relation_type,
            description: relation.description.clone(),
            column_mappings: relation.column_mappings.clone(),
        }
    }
}
