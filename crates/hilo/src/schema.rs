//! Counter-table declarations.
//!
//! The allocator never creates tables. It describes the counter table it
//! needs as a [`TableSpec`] and leaves creation to the host's migration or
//! table-definition machinery, alongside the application tables the ids are
//! for.

/// Default counter table name for the unkeyed allocator.
pub const SINGLE_HILO_TABLE: &str = "single_hilo";

/// Default counter table name for the keyed (row-per-table) allocator.
pub const ROW_PER_TABLE_HILO_TABLE: &str = "row_per_table_hilo";

/// Column type of a declared counter-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 64-bit signed integer.
    BigInt,
    /// Variable-length string with a maximum length.
    Text {
        /// Maximum length in characters.
        max_len: u32,
    },
}

/// One column of a declared counter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: &'static str,
    /// Column type.
    pub ty: ColumnType,
    /// Whether the column admits NULL.
    pub nullable: bool,
    /// Whether the column is (part of) the primary key.
    pub primary_key: bool,
}

/// A described counter table: name, optional schema qualifier, and columns.
///
/// Hand this to whatever creates the application tables so the counter table
/// exists before the first allocation.
///
/// # Example
/// ```
/// use hilo::{ColumnType, TableSpec};
///
/// let table = TableSpec::keyed("row_per_table_hilo", Some("app".into()));
/// assert_eq!(table.qualified_name(), "app.row_per_table_hilo");
/// assert_eq!(table.columns()[0].name, "table_name");
/// assert!(table.columns()[0].primary_key);
/// assert_eq!(table.columns()[1].ty, ColumnType::BigInt);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Declares the unkeyed counter table: a single `next_hi` column holding
    /// the sole counter row.
    pub fn single(name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            name: name.into(),
            schema,
            columns: vec![ColumnSpec {
                name: "next_hi",
                ty: ColumnType::BigInt,
                nullable: false,
                primary_key: false,
            }],
        }
    }

    /// Declares the keyed counter table: one row per secondary key, with the
    /// key column as primary key.
    pub fn keyed(name: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            name: name.into(),
            schema,
            columns: vec![
                ColumnSpec {
                    name: "table_name",
                    ty: ColumnType::Text { max_len: 255 },
                    nullable: false,
                    primary_key: true,
                },
                ColumnSpec {
                    name: "next_hi",
                    ty: ColumnType::BigInt,
                    nullable: false,
                    primary_key: false,
                },
            ],
        }
    }

    /// Table name without the schema qualifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional schema/namespace qualifier.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Declared columns, in definition order.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// `schema.table` when a schema is set, else the bare table name.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_table_declares_one_bigint_column() {
        let table = TableSpec::single(SINGLE_HILO_TABLE, None);
        assert_eq!(table.qualified_name(), "single_hilo");
        assert_eq!(table.columns().len(), 1);
        let col = table.columns()[0];
        assert_eq!(col.name, "next_hi");
        assert_eq!(col.ty, ColumnType::BigInt);
        assert!(!col.nullable);
        assert!(!col.primary_key);
    }

    #[test]
    fn keyed_table_declares_key_as_primary() {
        let table = TableSpec::keyed(ROW_PER_TABLE_HILO_TABLE, None);
        assert_eq!(table.columns().len(), 2);
        let key = table.columns()[0];
        assert_eq!(key.name, "table_name");
        assert_eq!(key.ty, ColumnType::Text { max_len: 255 });
        assert!(key.primary_key);
        assert_eq!(table.columns()[1].name, "next_hi");
    }

    #[test]
    fn qualified_name_includes_schema() {
        let table = TableSpec::single("hilo", Some("accounting".into()));
        assert_eq!(table.qualified_name(), "accounting.hilo");
    }
}
