//! DDL generation for table designs
//!
//! Generates CREATE TABLE (plus CREATE INDEX) and ALTER TABLE statements for the
//! supported dialects. The generator is a stateless utility: every method takes
//! the design data as input and returns the statement text.
//!
//! ALTER output is a column-level diff, followed by a rename when the table
//! code changed. Index additions and removals are not reflected.

use super::schema::{ColumnSet, DataType, DbType, Field, IndexType, TableDesign};
use super::validation::is_reserved_keyword;

/// DDL generation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DdlError {
    #[error("no columns defined for table '{0}'")]
    NoColumns(String),

    #[error("column '{column}' of type {data_type} requires a length")]
    MissingLength { column: String, data_type: DataType },

    #[error("column '{column}' of type {data_type} requires a precision")]
    MissingPrecision { column: String, data_type: DataType },

    #[error("{dialect} does not support {operation}")]
    Unsupported {
        dialect: DbType,
        operation: &'static str,
    },
}

/// How a data type is spelled in a dialect
enum TypeShape {
    Plain(&'static str),
    Sized(&'static str),
    Scaled(&'static str),
}

/// DDL Generator for creating SQL statements from table designs
pub struct DdlGenerator;

impl DdlGenerator {
    /// Generate the CREATE TABLE statement for a design, followed by one
    /// CREATE INDEX statement per non-primary index.
    pub fn generate_create(design: &TableDesign) -> Result<String, DdlError> {
        let dialect = design.dialect();
        let columns = match &design.columns {
            Some(columns) if !columns.is_empty() => columns,
            _ => return Err(DdlError::NoColumns(design.code.clone())),
        };
        let table = Self::quote_ident(&design.code, dialect);

        let mut defs = columns
            .fields
            .iter()
            .map(|f| Self::column_definition(f, dialect))
            .collect::<Result<Vec<_>, _>>()?;

        let mut pk_columns = columns.primary_key_columns();
        if pk_columns.is_empty()
            && let Some(primary) = columns
                .indexes
                .iter()
                .find(|i| i.index_type == IndexType::Primary)
        {
            pk_columns = primary.columns.iter().map(String::as_str).collect();
        }
        if !pk_columns.is_empty() {
            defs.push(format!(
                "PRIMARY KEY ({})",
                Self::ident_list(pk_columns.iter().copied(), dialect)
            ));
        }

        let mut ddl = format!("CREATE TABLE {} (\n  {}\n)", table, defs.join(",\n  "));

        if dialect == DbType::MySql {
            if let Some(meta) = &design.metadata {
                ddl.push_str(&format!(
                    " ENGINE={} DEFAULT CHARSET={} COLLATE={}",
                    meta.engine, meta.charset, meta.collate
                ));
            }
            if let Some(comment) = non_empty(&design.comment) {
                ddl.push_str(&format!(" COMMENT={}", Self::quote_literal(comment, dialect)));
            }
        }
        ddl.push(';');

        let mut statements = vec![ddl];

        if dialect == DbType::PostgreSql {
            statements.extend(Self::postgres_comments(design, columns));
        }

        statements.extend(Self::index_statements(&design.code, columns, dialect));

        Ok(statements.join("\n"))
    }

    /// Generate the ALTER TABLE statement turning `old` into `new`.
    ///
    /// Returns an empty string when the column sets are equivalent and the
    /// code is unchanged; callers must not execute it.
    pub fn generate_alter(old: &TableDesign, new: &TableDesign) -> Result<String, DdlError> {
        let empty = ColumnSet::default();
        let dialect = new.dialect();
        let columns = Self::generate_alter_columns(
            &old.code,
            dialect,
            old.columns.as_ref().unwrap_or(&empty),
            new.columns.as_ref().unwrap_or(&empty),
        )?;

        if old.code == new.code {
            return Ok(columns);
        }
        let rename = Self::generate_rename(&old.code, &new.code, dialect);
        Ok(if columns.is_empty() {
            rename
        } else {
            format!("{}\n{}", columns, rename)
        })
    }

    /// Rename a live table from `old_code` to `new_code`
    pub fn generate_rename(old_code: &str, new_code: &str, dialect: DbType) -> String {
        match dialect {
            DbType::SqlServer => format!(
                "EXEC sp_rename {}, {};",
                Self::quote_literal(old_code, dialect),
                Self::quote_literal(new_code, dialect)
            ),
            DbType::MySql | DbType::PostgreSql | DbType::Oracle | DbType::Sqlite => format!(
                "ALTER TABLE {} RENAME TO {};",
                Self::quote_ident(old_code, dialect),
                Self::quote_ident(new_code, dialect)
            ),
        }
    }

    /// Column-level diff between two column sets of the same table
    pub fn generate_alter_columns(
        table_code: &str,
        dialect: DbType,
        old: &ColumnSet,
        new: &ColumnSet,
    ) -> Result<String, DdlError> {
        let table = Self::quote_ident(table_code, dialect);
        let mut clauses = Vec::new();
        let mut trailing = Vec::new();

        for field in &new.fields {
            match old.field(&field.name) {
                None => {
                    clauses.push(Self::add_clause(field, dialect)?);
                    if dialect == DbType::PostgreSql && non_empty(&field.comment).is_some() {
                        trailing.push(Self::postgres_column_comment(table_code, field));
                    }
                }
                Some(previous) if !previous.same_definition(field) => {
                    let (modify, extra) =
                        Self::modify_clauses(table_code, previous, field, dialect)?;
                    clauses.extend(modify);
                    trailing.extend(extra);
                }
                Some(_) => {}
            }
        }

        for field in &old.fields {
            if new.field(&field.name).is_none() {
                clauses.push(format!(
                    "DROP COLUMN {}",
                    Self::quote_ident(&field.name, dialect)
                ));
            }
        }

        if clauses.is_empty() && trailing.is_empty() {
            return Ok(String::new());
        }

        let mut statements = Vec::new();
        if !clauses.is_empty() {
            match dialect {
                DbType::MySql | DbType::PostgreSql => statements.push(format!(
                    "ALTER TABLE {}\n  {};",
                    table,
                    clauses.join(",\n  ")
                )),
                // These dialects reject mixed comma-separated operations
                DbType::Oracle | DbType::Sqlite | DbType::SqlServer => statements.extend(
                    clauses
                        .iter()
                        .map(|clause| format!("ALTER TABLE {} {};", table, clause)),
                ),
            }
        }
        statements.extend(trailing);

        Ok(statements.join("\n"))
    }

    /// Double single quotes (and, for MySQL, backslashes) so `value` can sit
    /// inside a single-quoted SQL literal.
    pub fn escape_literal(value: &str, dialect: DbType) -> String {
        let escaped = value.replace('\'', "''");
        if dialect == DbType::MySql {
            escaped.replace('\\', "\\\\")
        } else {
            escaped
        }
    }

    fn quote_literal(value: &str, dialect: DbType) -> String {
        format!("'{}'", Self::escape_literal(value, dialect))
    }

    /// Quote an identifier only when it collides with a reserved word
    fn quote_ident(name: &str, dialect: DbType) -> String {
        if !is_reserved_keyword(name) {
            return name.to_string();
        }
        match dialect {
            DbType::MySql => format!("`{}`", name),
            DbType::SqlServer => format!("[{}]", name),
            DbType::PostgreSql | DbType::Oracle | DbType::Sqlite => format!("\"{}\"", name),
        }
    }

    fn ident_list<'a>(names: impl Iterator<Item = &'a str>, dialect: DbType) -> String {
        names
            .map(|n| Self::quote_ident(n, dialect))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ========================================================================
    // Column Definitions
    // ========================================================================

    fn type_shape(data_type: DataType, dialect: DbType) -> TypeShape {
        use DataType as T;
        use TypeShape::{Plain, Scaled, Sized};

        match dialect {
            DbType::MySql => match data_type {
                t if t.requires_length() => Sized(t.as_str()),
                t if t.requires_precision() => Scaled(t.as_str()),
                t => Plain(t.as_str()),
            },
            DbType::PostgreSql => match data_type {
                T::TinyInt => Plain("SMALLINT"),
                T::LongText | T::Enum | T::Set => Plain("TEXT"),
                T::Float => Plain("REAL"),
                T::Double => Plain("DOUBLE PRECISION"),
                T::DateTime => Plain("TIMESTAMP"),
                T::Binary | T::VarBinary | T::Blob | T::LongBlob => Plain("BYTEA"),
                t if t.requires_length() => Sized(t.as_str()),
                t if t.requires_precision() => Scaled(t.as_str()),
                t => Plain(t.as_str()),
            },
            DbType::Oracle => match data_type {
                T::Int => Plain("NUMBER(10)"),
                T::BigInt => Plain("NUMBER(19)"),
                T::SmallInt => Plain("NUMBER(5)"),
                T::TinyInt => Plain("NUMBER(3)"),
                T::Boolean => Plain("NUMBER(1)"),
                T::VarChar => Sized("VARCHAR2"),
                T::Char => Sized("CHAR"),
                T::Binary | T::VarBinary => Sized("RAW"),
                T::Text | T::LongText => Plain("CLOB"),
                T::Decimal | T::Numeric => Scaled("NUMBER"),
                T::Float => Plain("BINARY_FLOAT"),
                T::Double => Plain("BINARY_DOUBLE"),
                T::Date => Plain("DATE"),
                T::DateTime | T::Timestamp => Plain("TIMESTAMP"),
                T::Blob | T::LongBlob => Plain("BLOB"),
                T::Enum | T::Set => Plain("VARCHAR2(255)"),
            },
            DbType::Sqlite => match data_type {
                T::Int | T::BigInt | T::SmallInt | T::TinyInt | T::Boolean => Plain("INTEGER"),
                T::Float | T::Double => Plain("REAL"),
                T::LongText | T::Enum | T::Set => Plain("TEXT"),
                T::LongBlob => Plain("BLOB"),
                t if t.requires_length() => Sized(t.as_str()),
                t if t.requires_precision() => Scaled(t.as_str()),
                t => Plain(t.as_str()),
            },
            DbType::SqlServer => match data_type {
                T::Text | T::LongText => Plain("NVARCHAR(MAX)"),
                T::Boolean => Plain("BIT"),
                T::Float => Plain("REAL"),
                T::Double => Plain("FLOAT(53)"),
                T::DateTime | T::Timestamp => Plain("DATETIME2"),
                T::Blob | T::LongBlob => Plain("VARBINARY(MAX)"),
                T::Enum | T::Set => Plain("NVARCHAR(255)"),
                t if t.requires_length() => Sized(t.as_str()),
                t if t.requires_precision() => Scaled(t.as_str()),
                t => Plain(t.as_str()),
            },
        }
    }

    fn column_type(field: &Field, dialect: DbType) -> Result<String, DdlError> {
        match Self::type_shape(field.data_type, dialect) {
            TypeShape::Plain(name) => Ok(name.to_string()),
            TypeShape::Sized(name) => match field.length {
                Some(length) if length > 0 => Ok(format!("{}({})", name, length)),
                _ => Err(DdlError::MissingLength {
                    column: field.name.clone(),
                    data_type: field.data_type,
                }),
            },
            TypeShape::Scaled(name) => match field.precision {
                Some(precision) if precision > 0 => Ok(format!(
                    "{}({},{})",
                    name,
                    precision,
                    field.scale.unwrap_or(0)
                )),
                _ => Err(DdlError::MissingPrecision {
                    column: field.name.clone(),
                    data_type: field.data_type,
                }),
            },
        }
    }

    /// `name type [NOT NULL] [DEFAULT v] [COMMENT 'c']`
    fn column_definition(field: &Field, dialect: DbType) -> Result<String, DdlError> {
        let mut def = format!(
            "{} {}",
            Self::quote_ident(&field.name, dialect),
            Self::column_type(field, dialect)?
        );

        let default = non_empty(&field.default_value).map(|v| Self::render_default(v, dialect));

        // Oracle only accepts DEFAULT ahead of constraints
        if dialect == DbType::Oracle {
            if let Some(default) = &default {
                def.push_str(&format!(" DEFAULT {}", default));
            }
            if !field.nullable {
                def.push_str(" NOT NULL");
            }
        } else {
            if !field.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &default {
                def.push_str(&format!(" DEFAULT {}", default));
            }
        }

        if dialect == DbType::MySql
            && let Some(comment) = non_empty(&field.comment)
        {
            def.push_str(&format!(" COMMENT {}", Self::quote_literal(comment, dialect)));
        }

        Ok(def)
    }

    /// Numbers, SQL keywords and functions pass through; quoted literals are
    /// re-escaped; anything else becomes a string literal.
    fn render_default(value: &str, dialect: DbType) -> String {
        const KEYWORDS: &[&str] = &[
            "NULL",
            "TRUE",
            "FALSE",
            "CURRENT_TIMESTAMP",
            "CURRENT_TIMESTAMP()",
            "CURRENT_DATE",
            "CURRENT_TIME",
            "LOCALTIME",
            "LOCALTIMESTAMP",
            "NOW()",
        ];

        let trimmed = value.trim();
        let upper = trimmed.to_ascii_uppercase();

        if KEYWORDS.contains(&upper.as_str()) {
            return upper;
        }

        let numeric = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
            && trimmed.parse::<f64>().is_ok();
        if numeric {
            return trimmed.to_string();
        }

        if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
            let inner = trimmed[1..trimmed.len() - 1].replace("''", "'");
            return Self::quote_literal(&inner, dialect);
        }

        Self::quote_literal(value, dialect)
    }

    // ========================================================================
    // ALTER Clauses
    // ========================================================================

    fn add_clause(field: &Field, dialect: DbType) -> Result<String, DdlError> {
        let def = Self::column_definition(field, dialect)?;
        Ok(match dialect {
            DbType::Oracle => format!("ADD ({})", def),
            DbType::SqlServer => format!("ADD {}", def),
            DbType::MySql | DbType::PostgreSql | DbType::Sqlite => format!("ADD COLUMN {}", def),
        })
    }

    /// Clauses for a changed column, plus statements that must follow the ALTER
    fn modify_clauses(
        table_code: &str,
        old: &Field,
        new: &Field,
        dialect: DbType,
    ) -> Result<(Vec<String>, Vec<String>), DdlError> {
        match dialect {
            DbType::MySql => Ok((
                vec![format!(
                    "MODIFY COLUMN {}",
                    Self::column_definition(new, dialect)?
                )],
                Vec::new(),
            )),
            DbType::Oracle => {
                // Restating an unchanged NULL/NOT NULL is an error in Oracle
                let mut def = format!(
                    "{} {}",
                    Self::quote_ident(&new.name, dialect),
                    Self::column_type(new, dialect)?
                );
                match non_empty(&new.default_value) {
                    Some(v) => def.push_str(&format!(" DEFAULT {}", Self::render_default(v, dialect))),
                    None if non_empty(&old.default_value).is_some() => def.push_str(" DEFAULT NULL"),
                    None => {}
                }
                if old.nullable != new.nullable {
                    def.push_str(if new.nullable { " NULL" } else { " NOT NULL" });
                }
                Ok((vec![format!("MODIFY ({})", def)], Vec::new()))
            }
            DbType::SqlServer => {
                // Defaults are constraints in SQL Server and cannot be altered inline
                let mut def = format!(
                    "{} {}",
                    Self::quote_ident(&new.name, dialect),
                    Self::column_type(new, dialect)?
                );
                def.push_str(if new.nullable { " NULL" } else { " NOT NULL" });
                Ok((vec![format!("ALTER COLUMN {}", def)], Vec::new()))
            }
            DbType::Sqlite => Err(DdlError::Unsupported {
                dialect,
                operation: "modifying an existing column",
            }),
            DbType::PostgreSql => {
                let column = Self::quote_ident(&new.name, dialect);
                let mut clauses = Vec::new();
                let mut trailing = Vec::new();

                if old.data_type != new.data_type
                    || old.length != new.length
                    || old.precision != new.precision
                    || old.scale != new.scale
                {
                    clauses.push(format!(
                        "ALTER COLUMN {} TYPE {}",
                        column,
                        Self::column_type(new, dialect)?
                    ));
                }
                if old.nullable != new.nullable {
                    clauses.push(format!(
                        "ALTER COLUMN {} {}",
                        column,
                        if new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" }
                    ));
                }
                if old.default_value != new.default_value {
                    clauses.push(match non_empty(&new.default_value) {
                        Some(v) => format!(
                            "ALTER COLUMN {} SET DEFAULT {}",
                            column,
                            Self::render_default(v, dialect)
                        ),
                        None => format!("ALTER COLUMN {} DROP DEFAULT", column),
                    });
                }
                if old.comment != new.comment {
                    trailing.push(Self::postgres_column_comment(table_code, new));
                }
                Ok((clauses, trailing))
            }
        }
    }

    // ========================================================================
    // Comments and Indexes
    // ========================================================================

    fn postgres_comments(design: &TableDesign, columns: &ColumnSet) -> Vec<String> {
        let dialect = DbType::PostgreSql;
        let mut statements = Vec::new();
        if let Some(comment) = non_empty(&design.comment) {
            statements.push(format!(
                "COMMENT ON TABLE {} IS {};",
                Self::quote_ident(&design.code, dialect),
                Self::quote_literal(comment, dialect)
            ));
        }
        statements.extend(
            columns
                .fields
                .iter()
                .filter(|f| non_empty(&f.comment).is_some())
                .map(|f| Self::postgres_column_comment(&design.code, f)),
        );
        statements
    }

    fn postgres_column_comment(table_code: &str, field: &Field) -> String {
        let dialect = DbType::PostgreSql;
        let comment = match non_empty(&field.comment) {
            Some(c) => Self::quote_literal(c, dialect),
            None => "NULL".to_string(),
        };
        format!(
            "COMMENT ON COLUMN {}.{} IS {};",
            Self::quote_ident(table_code, dialect),
            Self::quote_ident(&field.name, dialect),
            comment
        )
    }

    /// Declared non-primary indexes, then field-level index names that no
    /// declared index covers (grouped over every field naming them).
    fn index_statements(table_code: &str, columns: &ColumnSet, dialect: DbType) -> Vec<String> {
        let table = Self::quote_ident(table_code, dialect);
        let mut statements = Vec::new();

        for index in &columns.indexes {
            let kind = match index.index_type {
                IndexType::Primary => continue,
                IndexType::Unique => "UNIQUE INDEX",
                IndexType::Fulltext if dialect == DbType::MySql => "FULLTEXT INDEX",
                IndexType::Fulltext | IndexType::Index => "INDEX",
            };
            statements.push(format!(
                "CREATE {} {} ON {} ({});",
                kind,
                Self::quote_ident(&index.name, dialect),
                table,
                Self::ident_list(index.columns.iter().map(String::as_str), dialect)
            ));
        }

        let mut implicit: Vec<(&str, Vec<&str>)> = Vec::new();
        for field in &columns.fields {
            for name in &field.indexes {
                if columns.indexes.iter().any(|i| &i.name == name) {
                    continue;
                }
                match implicit.iter_mut().find(|(n, _)| *n == name.as_str()) {
                    Some((_, cols)) => {
                        if !cols.contains(&field.name.as_str()) {
                            cols.push(field.name.as_str());
                        }
                    }
                    None => implicit.push((name.as_str(), vec![field.name.as_str()])),
                }
            }
        }
        for (name, cols) in implicit {
            statements.push(format!(
                "CREATE INDEX {} ON {} ({});",
                Self::quote_ident(name, dialect),
                table,
                Self::ident_list(cols.into_iter(), dialect)
            ));
        }

        statements
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
