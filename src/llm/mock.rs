//! Mock LLM client for testing.
//!
//! Provides deterministic agent decisions based on input patterns, in the
//! same JSON shape the classifier expects from a real model.

use async_trait::async_trait;

use crate::error::Result;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned decisions based on input patterns.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a custom response mapping.
    ///
    /// When the input contains `pattern`, the mock will return `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Generates a mock decision based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        // Check custom responses first
        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        // Default pattern matching
        if input_lower.contains("all customers") || input_lower.contains("list customers") {
            return decision("shop", "SELECT * FROM customers;", "read");
        }

        if input_lower.contains("count") && input_lower.contains("orders") {
            return decision("shop", "SELECT COUNT(*) FROM orders;", "read");
        }

        if input_lower.contains("delete customer 42") {
            return decision("shop", "DELETE FROM customers WHERE id=42;", "write");
        }

        if input_lower.contains("add") && input_lower.contains("customer") {
            return decision(
                "shop",
                "INSERT INTO customers (email, name) VALUES ('test@example.com', 'Test Customer');",
                "write",
            );
        }

        if input_lower.contains("update price") && input_lower.contains("nonexistent_db") {
            return decision("nonexistent_db", "UPDATE products SET price = 10;", "write");
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

/// Builds a decision JSON string in the classifier's expected shape.
fn decision(database: &str, sql: &str, intent: &str) -> String {
    serde_json::json!({
        "database_name": database,
        "sql_query": sql,
        "intent": intent,
    })
    .to_string()
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Message;

    #[tokio::test]
    async fn test_mock_returns_select_all_customers() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("List all customers")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT * FROM customers"));
        assert!(response.contains("\"read\""));
    }

    #[tokio::test]
    async fn test_mock_returns_delete_decision() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("Delete customer 42 from shop")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("DELETE FROM customers WHERE id=42;"));
        assert!(response.contains("\"write\""));
    }

    #[tokio::test]
    async fn test_mock_returns_unknown_response() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("What is the meaning of life?")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("don't understand"));
    }

    #[tokio::test]
    async fn test_mock_custom_response() {
        let client = MockLlmClient::new().with_response(
            "custom query",
            r#"{"database_name": "crm", "sql_query": "SELECT custom FROM t;", "intent": "read"}"#,
        );

        let messages = vec![Message::user("Run the custom query")];
        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT custom FROM t"));
    }

    #[tokio::test]
    async fn test_mock_case_insensitive() {
        let client = MockLlmClient::new();
        let messages = vec![Message::user("LIST ALL CUSTOMERS")];

        let response = client.complete(&messages).await.unwrap();

        assert!(response.contains("SELECT * FROM customers"));
    }
}
