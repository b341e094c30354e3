//! Mock database clients for testing.
//!
//! `MockDatabaseClient` records every mutation it executes, so tests can
//! assert that no write reaches the database before approval.

use super::{ColumnInfo, DatabaseClient, QueryResult, Schema, Value};
use crate::error::{Result, StewardError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A mock database client that returns predefined results.
pub struct MockDatabaseClient {
    schema: Schema,
    mutations: Mutex<Vec<String>>,
    rows_affected: u64,
}

impl MockDatabaseClient {
    /// Creates a new mock database client with an empty schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            mutations: Mutex::new(Vec::new()),
            rows_affected: 1,
        }
    }

    /// Creates a new mock database client with the given schema.
    pub fn with_schema(schema: Schema) -> Self {
        Self {
            schema,
            mutations: Mutex::new(Vec::new()),
            rows_affected: 1,
        }
    }

    /// Sets the rows-affected count reported for mutations.
    pub fn with_rows_affected(mut self, rows_affected: u64) -> Self {
        self.rows_affected = rows_affected;
        self
    }

    /// Returns the SQL of every mutation executed so far.
    pub fn executed_mutations(&self) -> Vec<String> {
        self.mutations.lock().expect("mutations lock").clone()
    }
}

impl Default for MockDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        let columns = vec![ColumnInfo {
            name: "result".to_string(),
            data_type: "text".to_string(),
        }];
        let rows = vec![vec![Value::String(format!("Mock result for: {}", sql))]];

        Ok(QueryResult {
            columns,
            rows,
            execution_time: Duration::from_millis(1),
            row_count: 1,
            total_rows: Some(1),
            was_truncated: false,
        })
    }

    async fn execute_mutation(&self, sql: &str) -> Result<u64> {
        self.mutations
            .lock()
            .expect("mutations lock")
            .push(sql.to_string());
        Ok(self.rows_affected)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock client whose statements always fail, for driver-error paths.
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given driver error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(Schema::default())
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(StewardError::execution(self.message.clone()))
    }

    async fn execute_mutation(&self, _sql: &str) -> Result<u64> {
        Err(StewardError::execution(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_select() {
        let client = MockDatabaseClient::new();
        let result = client.execute_query("SELECT 1").await.unwrap();
        assert_eq!(result.row_count, 1);
        assert_eq!(result.columns.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_records_mutations() {
        let client = MockDatabaseClient::new();
        assert!(client.executed_mutations().is_empty());

        let affected = client
            .execute_mutation("DELETE FROM customers WHERE id=42;")
            .await
            .unwrap();

        assert_eq!(affected, 1);
        assert_eq!(
            client.executed_mutations(),
            vec!["DELETE FROM customers WHERE id=42;".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = FailingDatabaseClient::new("constraint violation");
        let err = client.execute_mutation("DELETE FROM t").await.unwrap_err();
        assert!(err.to_string().contains("constraint violation"));
    }
}
