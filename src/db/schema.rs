//! Database schema types for db-steward.
//!
//! Represents the structure of a database including tables, columns and
//! foreign keys. The formatted summary is what the intent classifier sees.

use serde::{Deserialize, Serialize};

/// Represents the complete schema of a database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,

    /// Foreign key relationships between tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM system prompt.
    ///
    /// Produces a compact human-readable representation that helps the model
    /// pick tables and columns.
    pub fn format_for_llm(&self) -> String {
        let mut out = String::new();

        for table in &self.tables {
            out.push_str(&format!("Table: {}\n", table.name));
            for column in &table.columns {
                let mut annotations = Vec::new();
                if table.primary_key.contains(&column.name) {
                    annotations.push("PK".to_string());
                }
                if !column.is_nullable {
                    annotations.push("NOT NULL".to_string());
                }
                for fk in &self.foreign_keys {
                    if fk.from_table == table.name && fk.from_columns.contains(&column.name) {
                        annotations.push(format!(
                            "FK -> {}.{}",
                            fk.to_table,
                            fk.to_columns.first().map(String::as_str).unwrap_or("")
                        ));
                    }
                }

                if annotations.is_empty() {
                    out.push_str(&format!("  - {}: {}\n", column.name, column.data_type));
                } else {
                    out.push_str(&format!(
                        "  - {}: {} ({})\n",
                        column.name,
                        column.data_type,
                        annotations.join(", ")
                    ));
                }
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

/// A table in a database schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,

    /// Names of the primary key columns.
    pub primary_key: Vec<String>,
}

/// A column in a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Column data type.
    pub data_type: String,

    /// Whether the column is nullable.
    pub is_nullable: bool,

    /// Default value, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a new nullable column.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets the nullability of the column.
    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }
}

/// A foreign key relationship between two tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForeignKey {
    /// The referencing table.
    pub from_table: String,

    /// The referencing columns.
    pub from_columns: Vec<String>,

    /// The referenced table.
    pub to_table: String,

    /// The referenced columns.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a new foreign key relationship.
    pub fn new(
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}
