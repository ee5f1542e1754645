//! Backend-native form of a compiled filter.
//!
//! A [`NativeQuery`] is inert: it holds the root table, the INNER JOINs, the
//! WHERE text with its positional parameters, and the columns to read back.
//! Nothing touches the database until the materializer executes it.

use std::fmt;

use crate::schema_catalog::naming::quote_identifier;
use crate::schema_catalog::SqlValue;

use super::ToSql;

/// `"<alias>"."<column>"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table_alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table_alias: impl Into<String>, column: impl Into<String>) -> Self {
        ColumnRef {
            table_alias: table_alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}",
            quote_identifier(&self.table_alias),
            quote_identifier(&self.column)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItem {
    pub column: ColumnRef,
    /// Logical field the column is decoded into
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectItems {
    pub items: Vec<SelectItem>,
    pub distinct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FromTable {
    pub table_name: String,
}

/// `INNER JOIN <table> [AS <alias>] ON <left> = <right>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table_name: String,
    /// Set only when the table is already in scope under its own name
    pub table_alias: Option<String>,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

impl Join {
    /// Name the joined table is referenced by.
    pub fn alias(&self) -> &str {
        self.table_alias.as_deref().unwrap_or(&self.table_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    /// One value per `?`, in placeholder order
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeQuery {
    /// Entity type the rows decode into
    pub root_type: String,
    pub select: SelectItems,
    pub from: FromTable,
    pub joins: Vec<Join>,
    pub filters: Option<WhereClause>,
}

impl NativeQuery {
    pub fn params(&self) -> &[SqlValue] {
        self.filters
            .as_ref()
            .map(|w| w.params.as_slice())
            .unwrap_or(&[])
    }

    pub fn where_sql(&self) -> Option<&str> {
        self.filters.as_ref().map(|w| w.sql.as_str())
    }

    /// Copy of this query selecting each row only once.
    pub fn distinct(&self) -> NativeQuery {
        let mut query = self.clone();
        query.select.distinct = true;
        query
    }

    /// Logical field names in select order.
    pub fn selected_fields(&self) -> impl Iterator<Item = &str> {
        self.select.items.iter().map(|item| item.field.as_str())
    }
}

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        let columns: Vec<String> = self
            .items
            .iter()
            .map(|item| item.column.to_string())
            .collect();
        if self.distinct {
            format!("SELECT DISTINCT {}", columns.join(", "))
        } else {
            format!("SELECT {}", columns.join(", "))
        }
    }
}

impl ToSql for FromTable {
    fn to_sql(&self) -> String {
        format!("FROM {}", quote_identifier(&self.table_name))
    }
}

impl ToSql for Join {
    fn to_sql(&self) -> String {
        let table_expr = match &self.table_alias {
            Some(alias) => format!(
                "{} AS {}",
                quote_identifier(&self.table_name),
                quote_identifier(alias)
            ),
            None => quote_identifier(&self.table_name),
        };
        format!("INNER JOIN {} ON {} = {}", table_expr, self.left, self.right)
    }
}

impl ToSql for WhereClause {
    fn to_sql(&self) -> String {
        format!("WHERE {}", self.sql)
    }
}

impl ToSql for NativeQuery {
    fn to_sql(&self) -> String {
        let mut parts = vec![self.select.to_sql(), self.from.to_sql()];
        parts.extend(self.joins.iter().map(ToSql::to_sql));
        if let Some(filters) = &self.filters {
            parts.push(filters.to_sql());
        }
        parts.join(" ")
    }
}
