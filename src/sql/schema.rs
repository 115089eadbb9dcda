use std::collections::BTreeMap;

use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::error::CompileError;
use crate::sql::clause::Column;

/// Resolves a `table.column` reference into a [`Column`] operand.
///
/// The two implementations are interchangeable in the translator: they share
/// the clause model and differ only in whether resolution is validated
/// against a schema.
pub trait ColumnResolver {
    /// Resolve a reference, or fail with [`CompileError::UnknownTable`] /
    /// [`CompileError::UnknownColumn`].
    fn resolve(&self, table: &str, column: &str) -> Result<Column, CompileError>;
}

/// The portable backend: accepts any reference without a schema, producing a
/// clause tree renderable to literal SQL text.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl ColumnResolver for Unchecked {
    fn resolve(&self, table: &str, column: &str) -> Result<Column, CompileError> {
        Ok(Column::new(table, column))
    }
}

/// Coarse SQL column type carried by the schema catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    /// Boolean columns.
    Boolean,
    /// Integer-family columns.
    Integer,
    /// Floating-point and decimal columns.
    Float,
    /// Character and text columns.
    Text,
    /// Any other declared type.
    Other,
}

impl SqlType {
    fn from_declared(data_type: &sqlparser::ast::DataType) -> Self {
        let declared = data_type.to_string().to_ascii_lowercase();
        if declared.starts_with("bool") {
            SqlType::Boolean
        } else if declared.contains("int") || declared == "serial" || declared == "bigserial" {
            SqlType::Integer
        } else if declared.contains("float")
            || declared.contains("double")
            || declared.contains("real")
            || declared.contains("numeric")
            || declared.contains("decimal")
        {
            SqlType::Float
        } else if declared.contains("char") || declared.contains("text") {
            SqlType::Text
        } else {
            SqlType::Other
        }
    }
}

/// The schema-bound backend: a read-only table/column catalog that validates
/// references at translate time.
///
/// Identifiers are normalized (unquoted, lowercased) on insertion and lookup,
/// so quoted DDL and evaluator output agree on names. The catalog is cheap to
/// share across threads.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, BTreeMap<String, SqlType>>,
}

impl SchemaCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        SchemaCatalog::default()
    }

    /// Add a table with its columns and declared types.
    pub fn with_table<N, S, C>(mut self, table: N, columns: C) -> Self
    where
        N: AsRef<str>,
        S: AsRef<str>,
        C: IntoIterator<Item = (S, SqlType)>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, ty)| (normalize_identifier(name.as_ref()), ty))
            .collect();
        self.tables
            .insert(normalize_identifier(table.as_ref()), columns);
        self
    }

    /// Build a catalog from `CREATE TABLE` DDL (PostgreSQL dialect).
    ///
    /// Statements other than `CREATE TABLE` are ignored.
    pub fn from_ddl(sql: &str) -> Result<Self, String> {
        let statements =
            Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|e| e.to_string())?;
        let mut catalog = SchemaCatalog::new();
        for statement in statements {
            let Statement::CreateTable(create) = statement else {
                continue;
            };
            let table = create
                .name
                .0
                .last()
                .map(|part| normalize_identifier(&part.to_string()))
                .ok_or_else(|| "CREATE TABLE with an empty name".to_string())?;
            let columns = create
                .columns
                .iter()
                .map(|col| {
                    (
                        normalize_identifier(&col.name.value),
                        SqlType::from_declared(&col.data_type),
                    )
                })
                .collect();
            catalog.tables.insert(table, columns);
        }
        Ok(catalog)
    }

    /// Declared type of a column, if present.
    pub fn column_type(&self, table: &str, column: &str) -> Option<SqlType> {
        self.tables
            .get(&normalize_identifier(table))?
            .get(&normalize_identifier(column))
            .copied()
    }

    /// True when the catalog knows the table.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&normalize_identifier(table))
    }
}

impl ColumnResolver for SchemaCatalog {
    fn resolve(&self, table: &str, column: &str) -> Result<Column, CompileError> {
        let table_key = normalize_identifier(table);
        let column_key = normalize_identifier(column);
        let columns = self
            .tables
            .get(&table_key)
            .ok_or_else(|| CompileError::UnknownTable(table_key.clone()))?;
        if !columns.contains_key(&column_key) {
            return Err(CompileError::UnknownColumn {
                table: table_key,
                column: column_key,
            });
        }
        Ok(Column::new(table_key, column_key))
    }
}

/// Return the identifier without surrounding double quotes.
fn unquote_identifier(ident: &str) -> &str {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ident)
}

/// Normalize an identifier for case-insensitive matching.
fn normalize_identifier(ident: &str) -> String {
    unquote_identifier(ident.trim()).to_ascii_lowercase()
}
