//! Validation of table designs before they are stored or synced
//!
//! The validator walks the raw `columns` and `metadata` JSON documents exactly once,
//! reports the first violation as a [`ValidationError`] naming the offending field,
//! and on success hands back the typed [`ColumnSet`] and [`Metadata`].
//!
//! Identifier rules (table codes, column and index names) follow the naming rules
//! shared by MySQL, PostgreSQL and other RDBMS. Those names end up in generated DDL,
//! where only reserved words get quoted.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde_json::{Map, Value};

use super::ddl::DdlGenerator;
use super::schema::{
    ColumnSet, DataType, DbType, Field, Index, IndexType, Metadata, ParseEnumError, TableDesign,
    TableDesignInput,
};

/// Maximum length for identifiers (MySQL standard)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Storage engines accepted in design metadata
pub const ALLOWED_ENGINES: &[&str] = &["InnoDB", "MyISAM", "MEMORY", "CSV", "ARCHIVE"];

/// Character sets accepted in design metadata
pub const ALLOWED_CHARSETS: &[&str] = &["utf8", "utf8mb4", "latin1", "gbk", "ascii", "binary"];

/// Collations accepted in design metadata
pub const ALLOWED_COLLATIONS: &[&str] = &[
    "utf8mb4_general_ci",
    "utf8mb4_unicode_ci",
    "utf8mb4_bin",
    "utf8mb4_0900_ai_ci",
    "utf8_general_ci",
    "utf8_unicode_ci",
    "utf8_bin",
    "latin1_swedish_ci",
    "gbk_chinese_ci",
    "ascii_general_ci",
    "binary",
];

/// SQL reserved keywords that cannot be used as identifiers without quoting
/// This is a combined list from MySQL, PostgreSQL, and SQL standard
static RESERVED_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // SQL Standard
        "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK",
        "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
        "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE", "DEFAULT", "DELETE", "DESC",
        "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN",
        "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT",
        "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON",
        "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE",
        "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN",
        "WHERE", "WITH",
        // MySQL specific
        "AUTO_INCREMENT", "BIGINT", "BINARY", "BLOB", "BOOL", "BOOLEAN", "CHANGE", "CHAR",
        "CHARACTER", "COLLATE", "DATE", "DATETIME", "DECIMAL", "DOUBLE", "ENUM", "EXPLAIN",
        "FLOAT", "FORCE", "IGNORE", "INT", "INTEGER", "INTERVAL", "LONGBLOB", "LONGTEXT",
        "MODIFY", "NUMERIC", "PROCEDURE", "REAL", "RENAME", "REPLACE", "SCHEMA", "SHOW",
        "SMALLINT", "TEXT", "TIME", "TIMESTAMP", "TINYINT", "TRIGGER", "TRUNCATE",
        "UNSIGNED", "VARBINARY", "VARCHAR", "VIEW", "YEAR",
        // PostgreSQL specific
        "ANALYSE", "ANALYZE", "ARRAY", "AUTHORIZATION", "BOTH", "CAST", "CONCURRENTLY",
        "DEFERRABLE", "DO", "EXCEPT", "ILIKE", "INITIALLY", "INTERSECT", "ISNULL",
        "LATERAL", "LEADING", "LOCALTIME", "LOCALTIMESTAMP", "NATURAL", "NOTNULL", "ONLY",
        "OVERLAPS", "PLACING", "RETURNING", "SESSION_USER", "SIMILAR", "SOME", "SYMMETRIC",
        "TRAILING", "USER", "VARIADIC", "VERBOSE", "WINDOW",
    ]
    .into_iter()
    .collect()
});

/// Check if a string is a reserved keyword
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name.to_uppercase().as_str())
}

// ============================================================================
// Identifier Rules
// ============================================================================

/// Reasons an identifier is rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Identifier is empty
    Empty,
    /// Identifier is too long
    TooLong { max: usize, actual: usize },
    /// Identifier contains invalid characters
    InvalidCharacters { invalid: Vec<char> },
    /// Identifier starts with a digit
    StartsWithDigit,
    /// Identifier contains only underscores/digits
    NoLetters,
    /// Identifier is a reserved keyword
    ReservedKeyword { keyword: String },
}

impl std::fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierError::Empty => write!(f, "Name cannot be empty"),
            IdentifierError::TooLong { max, actual } => {
                write!(f, "Name is too long ({} chars, max {})", actual, max)
            }
            IdentifierError::InvalidCharacters { invalid } => {
                let chars: String = invalid.iter().collect();
                write!(
                    f,
                    "Name contains invalid characters: '{}'. Only letters, numbers, and underscores are allowed",
                    chars
                )
            }
            IdentifierError::StartsWithDigit => write!(f, "Name cannot start with a digit"),
            IdentifierError::NoLetters => write!(f, "Name must contain at least one letter"),
            IdentifierError::ReservedKeyword { keyword } => {
                write!(f, "'{}' is a reserved SQL keyword", keyword)
            }
        }
    }
}

impl std::error::Error for IdentifierError {}

/// Identifier strictness level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationLevel {
    /// Only check critical errors (empty, too long, invalid chars, starts with digit).
    /// Reserved words are accepted and quoted by the DDL generator.
    #[default]
    Minimal,
    /// Minimal + reserved keywords
    Standard,
}

/// Validates a database identifier (table, column or index name)
pub fn validate_identifier(name: &str, level: ValidationLevel) -> Result<(), IdentifierError> {
    if name.trim().is_empty() {
        return Err(IdentifierError::Empty);
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(IdentifierError::TooLong {
            max: MAX_IDENTIFIER_LENGTH,
            actual: name.len(),
        });
    }

    // Only ASCII alphanumeric and underscore; surrounding whitespace counts as invalid
    let invalid: Vec<char> = name
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .collect();
    if !invalid.is_empty() {
        return Err(IdentifierError::InvalidCharacters { invalid });
    }

    if let Some(first_char) = name.chars().next()
        && first_char.is_ascii_digit()
    {
        return Err(IdentifierError::StartsWithDigit);
    }

    if !name.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(IdentifierError::NoLetters);
    }

    if level == ValidationLevel::Standard && is_reserved_keyword(name) {
        return Err(IdentifierError::ReservedKeyword {
            keyword: name.to_string(),
        });
    }

    Ok(())
}

// ============================================================================
// Design Validation
// ============================================================================

/// A rule violation, naming the offending field
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Typed documents produced by a successful validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedDesign {
    pub columns: Option<ColumnSet>,
    pub metadata: Option<Metadata>,
}

/// Checks table designs; holds no state besides the identifier level
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator {
    level: ValidationLevel,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier_level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    /// Validate a submitted design and parse its documents
    pub fn validate(&self, input: &TableDesignInput) -> Result<ValidatedDesign, ValidationError> {
        if input.code.trim().is_empty() {
            return Err(ValidationError::new("code", "is required"));
        }
        self.check_identifier("code", &input.code)?;

        if input.display_name.trim().is_empty() {
            return Err(ValidationError::new("displayName", "is required"));
        }

        let metadata = match &input.metadata {
            Some(value) if !value.is_null() => Some(self.validate_metadata(value)?),
            _ => None,
        };

        let columns = match &input.columns {
            Some(value) if !value.is_null() => Some(self.validate_columns(value)?),
            _ => None,
        };

        Ok(ValidatedDesign { columns, metadata })
    }

    /// Pre-sync gate: the design must have columns and CREATE generation must succeed
    pub fn validate_for_sync(&self, design: &TableDesign) -> Result<(), ValidationError> {
        if !design.has_columns() {
            return Err(ValidationError::new(
                "columns",
                format!("no columns defined for table '{}'", design.code),
            ));
        }

        DdlGenerator::generate_create(design)
            .map(|_| ())
            .map_err(|e| ValidationError::new("columns", e.to_string()))
    }

    /// Validate a `metadata` document against the allow-lists
    pub fn validate_metadata(&self, value: &Value) -> Result<Metadata, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::new("metadata", "must be an object"))?;

        let db_type_raw = required_str(obj, "dbType", "metadata.dbType")?;
        let db_type: DbType = db_type_raw
            .parse()
            .map_err(|e: ParseEnumError| {
                ValidationError::new("metadata.dbType", e.to_string())
            })?;

        let engine = allowed(obj, "engine", ALLOWED_ENGINES)?;
        let charset = allowed(obj, "charset", ALLOWED_CHARSETS)?;
        let collate = allowed(obj, "collate", ALLOWED_COLLATIONS)?;

        let mut extra = obj.clone();
        for key in ["dbType", "engine", "charset", "collate"] {
            extra.remove(key);
        }

        Ok(Metadata {
            db_type,
            engine,
            charset,
            collate,
            extra,
        })
    }

    /// Validate a `columns` document and parse it into a [`ColumnSet`]
    pub fn validate_columns(&self, value: &Value) -> Result<ColumnSet, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::new("columns", "must be an object"))?;

        let raw_fields = required_array(obj, "fields", "columns.fields")?;
        let raw_indexes = required_array(obj, "indexes", "columns.indexes")?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        let mut seen = HashSet::new();
        for (i, raw) in raw_fields.iter().enumerate() {
            let path = format!("columns.fields[{}]", i);
            let field = self.parse_field(raw, &path)?;
            if !seen.insert(field.name.clone()) {
                return Err(ValidationError::new(
                    format!("{}.name", path),
                    format!("duplicate field name '{}'", field.name),
                ));
            }
            fields.push(field);
        }

        let mut indexes = Vec::with_capacity(raw_indexes.len());
        let mut index_names = HashSet::new();
        for (i, raw) in raw_indexes.iter().enumerate() {
            let path = format!("columns.indexes[{}]", i);
            let index = self.parse_index(raw, &path)?;
            if !index_names.insert(index.name.clone()) {
                return Err(ValidationError::new(
                    format!("{}.name", path),
                    format!("duplicate index name '{}'", index.name),
                ));
            }
            if let Some(missing) = index.columns.iter().find(|c| !seen.contains(*c)) {
                return Err(ValidationError::new(
                    format!("{}.columns", path),
                    format!("references unknown field '{}'", missing),
                ));
            }
            indexes.push(index);
        }

        Ok(ColumnSet { fields, indexes })
    }

    fn parse_field(&self, raw: &Value, path: &str) -> Result<Field, ValidationError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationError::new(path, "must be an object"))?;

        let name = required_str(obj, "name", &format!("{}.name", path))?;
        self.check_identifier(&format!("{}.name", path), name)?;
        let display_name = required_str(obj, "displayName", &format!("{}.displayName", path))?;

        let type_path = format!("{}.dataType", path);
        let data_type: DataType = required_str(obj, "dataType", &type_path)?
            .parse()
            .map_err(|e: ParseEnumError| {
                ValidationError::new(&type_path, e.to_string())
            })?;

        let length = optional_u32(obj, "length", path)?;
        let precision = optional_u32(obj, "precision", path)?;
        let scale = optional_u32(obj, "scale", path)?;

        if data_type.requires_length() && !length.is_some_and(|l| l > 0) {
            return Err(ValidationError::new(
                format!("{}.length", path),
                format!("must be greater than 0 for {}", data_type),
            ));
        }

        if data_type.requires_precision() {
            match precision {
                Some(p) if p > 0 => {
                    if let Some(s) = scale
                        && s > p
                    {
                        return Err(ValidationError::new(
                            format!("{}.scale", path),
                            format!("scale {} exceeds precision {}", s, p),
                        ));
                    }
                }
                _ => {
                    return Err(ValidationError::new(
                        format!("{}.precision", path),
                        format!("must be greater than 0 for {}", data_type),
                    ));
                }
            }
        }

        let index_path = format!("{}.indexes", path);
        let indexes = match obj.get("indexes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item.as_str() {
                    Some(s) if !s.trim().is_empty() => {
                        self.check_identifier(&index_path, s).map(|_| s.to_string())
                    }
                    _ => Err(ValidationError::new(&index_path, "must contain index names")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ValidationError::new(&index_path, "must be an array")),
        };

        Ok(Field {
            name: name.to_string(),
            display_name: display_name.to_string(),
            data_type,
            length,
            precision,
            scale,
            nullable: optional_bool(obj, "nullable", true, path)?,
            primary_key: optional_bool(obj, "primaryKey", false, path)?,
            default_value: optional_text(obj, "defaultValue", path)?,
            comment: optional_text(obj, "comment", path)?,
            indexes,
        })
    }

    fn parse_index(&self, raw: &Value, path: &str) -> Result<Index, ValidationError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| ValidationError::new(path, "must be an object"))?;

        let name_path = format!("{}.name", path);
        let name = required_str(obj, "name", &name_path)?;
        self.check_identifier(&name_path, name)?;

        let type_path = format!("{}.type", path);
        let index_type: IndexType = required_str(obj, "type", &type_path)?
            .parse()
            .map_err(|e: ParseEnumError| {
                ValidationError::new(&type_path, e.to_string())
            })?;

        let columns_path = format!("{}.columns", path);
        let raw_columns = required_array(obj, "columns", &columns_path)?;
        if raw_columns.is_empty() {
            return Err(ValidationError::new(&columns_path, "must not be empty"));
        }

        let columns = raw_columns
            .iter()
            .map(|c| match c.as_str() {
                Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
                _ => Err(ValidationError::new(&columns_path, "must contain column names")),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Index {
            name: name.to_string(),
            index_type,
            columns,
        })
    }

    fn check_identifier(&self, field: &str, name: &str) -> Result<(), ValidationError> {
        validate_identifier(name, self.level).map_err(|e| ValidationError::new(field, e.to_string()))
    }
}

// ============================================================================
// JSON Helpers
// ============================================================================

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, ValidationError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(ValidationError::new(path, "is required"))
        }
        Some(_) => Err(ValidationError::new(path, "must be a string")),
    }
}

fn required_array<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ValidationError> {
    match obj.get(key) {
        Some(Value::Array(items)) => Ok(items),
        None | Some(Value::Null) => Err(ValidationError::new(path, "is required")),
        Some(_) => Err(ValidationError::new(path, "must be an array")),
    }
}

fn allowed(
    obj: &Map<String, Value>,
    key: &str,
    allow_list: &[&str],
) -> Result<String, ValidationError> {
    let path = format!("metadata.{}", key);
    let value = required_str(obj, key, &path)?;
    if allow_list.iter().any(|a| a.eq_ignore_ascii_case(value)) {
        Ok(value.to_string())
    } else {
        Err(ValidationError::new(
            path,
            format!("unsupported {} '{}'", key, value),
        ))
    }
}

fn optional_u32(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<u32>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| {
                ValidationError::new(format!("{}.{}", path, key), "must be a non-negative integer")
            }),
        Some(_) => Err(ValidationError::new(
            format!("{}.{}", path, key),
            "must be a non-negative integer",
        )),
    }
}

fn optional_bool(
    obj: &Map<String, Value>,
    key: &str,
    default: bool,
    path: &str,
) -> Result<bool, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ValidationError::new(
            format!("{}.{}", path, key),
            "must be a boolean",
        )),
    }
}

/// Strings are taken as-is; numbers and booleans keep their JSON spelling
fn optional_text(
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(ValidationError::new(
            format!("{}.{}", path, key),
            "must be a string",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn input_with_columns(columns: Value) -> TableDesignInput {
        TableDesignInput::new(Uuid::new_v4(), "users", "Users").with_columns(columns)
    }

    fn expect_error(input: &TableDesignInput) -> ValidationError {
        SchemaValidator::new()
            .validate(input)
            .expect_err("validation should fail")
    }

    // ========================================================================
    // Identifier Tests
    // ========================================================================

    #[test]
    fn test_valid_identifiers() {
        for name in ["users", "user_id", "User123", "a", "table_name_here"] {
            assert!(validate_identifier(name, ValidationLevel::Minimal).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        assert_eq!(
            validate_identifier("", ValidationLevel::Minimal),
            Err(IdentifierError::Empty)
        );
        assert_eq!(
            validate_identifier("1user", ValidationLevel::Minimal),
            Err(IdentifierError::StartsWithDigit)
        );
        assert_eq!(
            validate_identifier("___", ValidationLevel::Minimal),
            Err(IdentifierError::NoLetters)
        );
        assert!(matches!(
            validate_identifier("users; DROP TABLE x", ValidationLevel::Minimal),
            Err(IdentifierError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_identifier(&"a".repeat(65), ValidationLevel::Minimal),
            Err(IdentifierError::TooLong { max: 64, actual: 65 })
        ));
    }

    #[test]
    fn test_reserved_keywords_depend_on_level() {
        assert!(validate_identifier("order", ValidationLevel::Minimal).is_ok());
        assert!(matches!(
            validate_identifier("order", ValidationLevel::Standard),
            Err(IdentifierError::ReservedKeyword { .. })
        ));
        assert!(is_reserved_keyword("Select"));
        assert!(!is_reserved_keyword("users"));
    }

    // ========================================================================
    // Design Header Tests
    // ========================================================================

    #[test]
    fn test_missing_code_is_rejected() {
        let input = TableDesignInput::new(Uuid::new_v4(), "  ", "Users");
        let err = expect_error(&input);
        assert_eq!(err.field, "code");
    }

    #[test]
    fn test_missing_display_name_is_rejected() {
        let input = TableDesignInput::new(Uuid::new_v4(), "users", "");
        let err = expect_error(&input);
        assert_eq!(err.field, "displayName");
    }

    #[test]
    fn test_design_without_documents_is_valid() {
        let input = TableDesignInput::new(Uuid::new_v4(), "users", "Users");
        let validated = SchemaValidator::new().validate(&input).unwrap();
        assert!(validated.columns.is_none());
        assert!(validated.metadata.is_none());
    }

    // ========================================================================
    // Metadata Tests
    // ========================================================================

    #[test]
    fn test_valid_metadata_is_parsed() {
        let input = TableDesignInput::new(Uuid::new_v4(), "users", "Users").with_metadata(json!({
            "dbType": "MYSQL",
            "engine": "InnoDB",
            "charset": "utf8mb4",
            "collate": "utf8mb4_general_ci",
            "note": "kept"
        }));

        let meta = SchemaValidator::new()
            .validate(&input)
            .unwrap()
            .metadata
            .unwrap();
        assert_eq!(meta.db_type, DbType::MySql);
        assert_eq!(meta.engine, "InnoDB");
        assert_eq!(meta.extra.get("note"), Some(&json!("kept")));
    }

    #[test]
    fn test_metadata_requires_every_engine_key() {
        let input = TableDesignInput::new(Uuid::new_v4(), "users", "Users").with_metadata(json!({
            "dbType": "MYSQL",
            "engine": "InnoDB",
            "charset": "utf8mb4"
        }));
        assert_eq!(expect_error(&input).field, "metadata.collate");
    }

    #[test]
    fn test_metadata_rejects_unknown_values() {
        let base = json!({
            "dbType": "MYSQL",
            "engine": "InnoDB",
            "charset": "utf8mb4",
            "collate": "utf8mb4_general_ci"
        });

        for (key, bad) in [
            ("dbType", "MONGODB"),
            ("engine", "RocksDB"),
            ("charset", "koi8r"),
            ("collate", "klingon_ci"),
        ] {
            let mut meta = base.clone();
            meta[key] = json!(bad);
            let input =
                TableDesignInput::new(Uuid::new_v4(), "users", "Users").with_metadata(meta);
            assert_eq!(expect_error(&input).field, format!("metadata.{}", key));
        }
    }

    // ========================================================================
    // Column Tests
    // ========================================================================

    #[test]
    fn test_columns_require_both_arrays() {
        let err = expect_error(&input_with_columns(json!({ "fields": [] })));
        assert_eq!(err.field, "columns.indexes");

        let err = expect_error(&input_with_columns(json!({ "fields": {}, "indexes": [] })));
        assert_eq!(err.field, "columns.fields");
        assert_eq!(err.reason, "must be an array");
    }

    #[test]
    fn test_empty_arrays_are_accepted() {
        let input = input_with_columns(json!({ "fields": [], "indexes": [] }));
        let columns = SchemaValidator::new().validate(&input).unwrap().columns.unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_field_parsing() {
        let input = input_with_columns(json!({
            "fields": [
                { "name": "id", "displayName": "ID", "dataType": "int", "primaryKey": true, "nullable": false },
                { "name": "price", "displayName": "Price", "dataType": "DECIMAL", "precision": 10, "scale": 2, "defaultValue": 0 },
                { "name": "email", "displayName": "Email", "dataType": "VARCHAR", "length": 255, "indexes": ["idx_email"] }
            ],
            "indexes": []
        }));

        let columns = SchemaValidator::new().validate(&input).unwrap().columns.unwrap();
        assert_eq!(columns.fields.len(), 3);
        assert_eq!(columns.fields[0].data_type, DataType::Int);
        assert!(columns.fields[0].primary_key);
        assert!(!columns.fields[0].nullable);
        assert_eq!(columns.fields[1].default_value.as_deref(), Some("0"));
        assert_eq!(columns.fields[2].indexes, vec!["idx_email".to_string()]);
        assert!(columns.fields[2].nullable);
    }

    #[test]
    fn test_length_required_for_sized_types() {
        for data_type in ["VARCHAR", "CHAR", "BINARY", "VARBINARY"] {
            let input = input_with_columns(json!({
                "fields": [{ "name": "code", "displayName": "Code", "dataType": data_type }],
                "indexes": []
            }));
            assert_eq!(expect_error(&input).field, "columns.fields[0].length");

            let input = input_with_columns(json!({
                "fields": [{ "name": "code", "displayName": "Code", "dataType": data_type, "length": 0 }],
                "indexes": []
            }));
            assert_eq!(expect_error(&input).field, "columns.fields[0].length");
        }
    }

    #[test]
    fn test_precision_required_for_decimal_types() {
        for data_type in ["DECIMAL", "NUMERIC"] {
            let input = input_with_columns(json!({
                "fields": [{ "name": "amount", "displayName": "Amount", "dataType": data_type }],
                "indexes": []
            }));
            assert_eq!(expect_error(&input).field, "columns.fields[0].precision");
        }

        let input = input_with_columns(json!({
            "fields": [{ "name": "amount", "displayName": "Amount", "dataType": "DECIMAL", "precision": 4, "scale": 6 }],
            "indexes": []
        }));
        assert_eq!(expect_error(&input).field, "columns.fields[0].scale");
    }

    #[test]
    fn test_unknown_data_type_names_the_field() {
        let input = input_with_columns(json!({
            "fields": [
                { "name": "id", "displayName": "ID", "dataType": "INT" },
                { "name": "doc", "displayName": "Doc", "dataType": "JSONB" }
            ],
            "indexes": []
        }));
        let err = expect_error(&input);
        assert_eq!(err.field, "columns.fields[1].dataType");
        assert!(err.reason.contains("JSONB"));
    }

    #[test]
    fn test_field_requires_name_and_display_name() {
        let input = input_with_columns(json!({
            "fields": [{ "displayName": "ID", "dataType": "INT" }],
            "indexes": []
        }));
        assert_eq!(expect_error(&input).field, "columns.fields[0].name");

        let input = input_with_columns(json!({
            "fields": [{ "name": "id", "dataType": "INT" }],
            "indexes": []
        }));
        assert_eq!(expect_error(&input).field, "columns.fields[0].displayName");
    }

    #[test]
    fn test_duplicate_field_names_are_rejected() {
        let input = input_with_columns(json!({
            "fields": [
                { "name": "id", "displayName": "ID", "dataType": "INT" },
                { "name": "id", "displayName": "Again", "dataType": "BIGINT" }
            ],
            "indexes": []
        }));
        let err = expect_error(&input);
        assert_eq!(err.field, "columns.fields[1].name");
        assert!(err.reason.contains("duplicate"));
    }

    #[test]
    fn test_unsafe_field_name_is_rejected() {
        let input = input_with_columns(json!({
            "fields": [{ "name": "id INT); DROP TABLE users; --", "displayName": "ID", "dataType": "INT" }],
            "indexes": []
        }));
        assert_eq!(expect_error(&input).field, "columns.fields[0].name");
    }

    #[test]
    fn test_index_rules() {
        let fields = json!([{ "name": "email", "displayName": "Email", "dataType": "VARCHAR", "length": 120 }]);

        let input = input_with_columns(json!({
            "fields": fields,
            "indexes": [{ "name": "idx_email", "type": "UNIQUE", "columns": ["email"] }]
        }));
        let columns = SchemaValidator::new().validate(&input).unwrap().columns.unwrap();
        assert_eq!(columns.indexes[0].index_type, IndexType::Unique);

        let input = input_with_columns(json!({
            "fields": fields,
            "indexes": [{ "name": "idx_email", "type": "BTREE", "columns": ["email"] }]
        }));
        assert_eq!(expect_error(&input).field, "columns.indexes[0].type");

        let input = input_with_columns(json!({
            "fields": fields,
            "indexes": [{ "name": "idx_email", "type": "INDEX", "columns": [] }]
        }));
        assert_eq!(expect_error(&input).field, "columns.indexes[0].columns");

        let input = input_with_columns(json!({
            "fields": fields,
            "indexes": [{ "type": "INDEX", "columns": ["email"] }]
        }));
        assert_eq!(expect_error(&input).field, "columns.indexes[0].name");

        let input = input_with_columns(json!({
            "fields": fields,
            "indexes": [{ "name": "idx_phone", "type": "INDEX", "columns": ["phone"] }]
        }));
        let err = expect_error(&input);
        assert_eq!(err.field, "columns.indexes[0].columns");
        assert!(err.reason.contains("phone"));
    }

    #[test]
    fn test_standard_level_rejects_keyword_columns() {
        let input = input_with_columns(json!({
            "fields": [{ "name": "order", "displayName": "Order", "dataType": "INT" }],
            "indexes": []
        }));

        assert!(SchemaValidator::new().validate(&input).is_ok());
        let err = SchemaValidator::new()
            .with_identifier_level(ValidationLevel::Standard)
            .validate(&input)
            .unwrap_err();
        assert_eq!(err.field, "columns.fields[0].name");
    }
}
