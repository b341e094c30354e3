//! Query execution against registered databases.
//!
//! Resolves the target database through the registry and runs the SQL with
//! the right entry point for its intent: reads return a rendered result
//! table, writes return an affected-row summary.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::registry::ConnectionRegistry;

/// Executes validated SQL against registry-resolved databases.
pub struct QueryExecutor {
    registry: Arc<ConnectionRegistry>,
}

impl QueryExecutor {
    /// Creates an executor over the given registry.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Runs a read statement and returns the rendered result table.
    pub async fn run_read(&self, database: &str, sql: &str) -> Result<String> {
        let client = self.registry.client(database)?;

        let start = Instant::now();
        let result = client.execute_query(sql).await?;

        info!(
            database = %database,
            rows = result.row_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Read executed"
        );

        Ok(result.render_table())
    }

    /// Runs a mutating statement and returns an affected-row summary.
    pub async fn run_write(&self, database: &str, sql: &str) -> Result<String> {
        let client = self.registry.client(database)?;

        let start = Instant::now();
        let affected = client.execute_mutation(sql).await?;

        info!(
            database = %database,
            rows_affected = affected,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Write executed"
        );

        Ok(format!("{} row(s) affected.", affected))
    }
}
