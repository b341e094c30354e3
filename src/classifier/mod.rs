//! LLM-backed request classification.
//!
//! Turns a natural-language request into a validated agent decision: which
//! database to use, what SQL to run, and whether the statement reads or
//! writes. The model's JSON output is validated strictly, and the final
//! intent is always re-derived from the SQL itself rather than trusted
//! from the model.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::db::Schema;
use crate::error::{Result, StewardError};
use crate::intent::{classify_intent, QueryIntent};
use crate::llm::{prompt, LlmClient};

/// A validated decision ready for routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDecision {
    /// Target database name, trimmed and lowercased.
    pub database_name: String,
    /// The SQL statement to run.
    pub sql: String,
    /// Final intent, derived from the SQL verb.
    pub intent: QueryIntent,
}

/// Raw JSON shape the model is asked to produce.
#[derive(Debug, Deserialize)]
struct RawDecision {
    database_name: Option<String>,
    sql_query: Option<String>,
    intent: Option<String>,
}

/// Classifies natural-language requests using an LLM.
pub struct IntentClassifier {
    llm: Box<dyn LlmClient>,
}

impl IntentClassifier {
    /// Creates a classifier over the given LLM client.
    pub fn new(llm: Box<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Classifies a request against the given database schemas.
    ///
    /// Returns a `Classification` error when the model's output cannot be
    /// validated. Invalid output is never coerced into a runnable decision.
    pub async fn classify(
        &self,
        query: &str,
        databases: &[(String, Schema)],
    ) -> Result<AgentDecision> {
        let messages = prompt::build_messages(databases, query);
        let response = self.llm.complete(&messages).await?;

        debug!(response_len = response.len(), "LLM classification response");
        validate_decision(&response)
    }
}

/// Validates a raw model response into an `AgentDecision`.
fn validate_decision(response: &str) -> Result<AgentDecision> {
    let json = extract_json(response).ok_or_else(|| {
        StewardError::classification(format!(
            "Model did not return a JSON decision: {}",
            truncate(response, 200)
        ))
    })?;

    let raw: RawDecision = serde_json::from_str(&json)
        .map_err(|e| StewardError::classification(format!("Malformed decision JSON: {}", e)))?;

    let database_name = raw
        .database_name
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StewardError::classification("Decision is missing 'database_name'"))?;

    let sql = raw
        .sql_query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StewardError::classification("Decision is missing 'sql_query'"))?;

    let claimed = match raw.intent.as_deref().map(str::trim) {
        Some(s) if s.eq_ignore_ascii_case("read") => QueryIntent::Read,
        Some(s) if s.eq_ignore_ascii_case("write") => QueryIntent::Write,
        Some(other) => {
            return Err(StewardError::classification(format!(
                "Decision has invalid intent '{}'",
                other
            )))
        }
        None => return Err(StewardError::classification("Decision is missing 'intent'")),
    };

    // The SQL verb is the source of truth; the model's claim is advisory.
    let derived = classify_intent(&sql);
    if derived.intent != claimed {
        warn!(
            claimed = claimed.as_str(),
            derived = derived.intent.as_str(),
            sql = %sql,
            "Model intent disagrees with SQL verb, using derived intent"
        );
    }

    Ok(AgentDecision {
        database_name,
        sql,
        intent: derived.intent,
    })
}

/// Extracts the JSON object from a model response.
///
/// Accepts bare JSON, a ```json fenced block, or JSON embedded in prose
/// (first '{' through the matching final '}').
fn extract_json(response: &str) -> Option<String> {
    let trimmed = response.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed.to_string());
    }

    if let Some(fence_start) = trimmed.find("```json") {
        let body_start = trimmed[fence_start..].find('\n')? + fence_start + 1;
        let body_end = trimmed[body_start..].find("```")? + body_start;
        return Some(trimmed[body_start..body_end].trim().to_string());
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        Some(trimmed[start..=end].to_string())
    } else {
        None
    }
}

/// Truncates a string for inclusion in error messages.
fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Schema;
    use crate::llm::MockLlmClient;

    fn databases() -> Vec<(String, Schema)> {
        vec![("shop".to_string(), Schema::default())]
    }

    #[tokio::test]
    async fn test_classify_read_request() {
        let classifier = IntentClassifier::new(Box::new(MockLlmClient::new()));

        let decision = classifier
            .classify("List all customers", &databases())
            .await
            .unwrap();

        assert_eq!(decision.database_name, "shop");
        assert_eq!(decision.sql, "SELECT * FROM customers;");
        assert_eq!(decision.intent, QueryIntent::Read);
    }

    #[tokio::test]
    async fn test_classify_write_request() {
        let classifier = IntentClassifier::new(Box::new(MockLlmClient::new()));

        let decision = classifier
            .classify("Delete customer 42", &databases())
            .await
            .unwrap();

        assert_eq!(decision.intent, QueryIntent::Write);
        assert!(decision.sql.starts_with("DELETE"));
    }

    #[tokio::test]
    async fn test_classify_non_json_response_fails() {
        let classifier = IntentClassifier::new(Box::new(MockLlmClient::new()));

        let err = classifier
            .classify("What is the meaning of life?", &databases())
            .await
            .unwrap_err();

        assert!(matches!(err, StewardError::Classification(_)));
    }

    #[tokio::test]
    async fn test_derived_intent_overrides_model_claim() {
        // Model claims "read" but the SQL is a DELETE.
        let mock = MockLlmClient::new().with_response(
            "sneaky",
            r#"{"database_name": "shop", "sql_query": "DELETE FROM customers;", "intent": "read"}"#,
        );
        let classifier = IntentClassifier::new(Box::new(mock));

        let decision = classifier
            .classify("run the sneaky query", &databases())
            .await
            .unwrap();

        assert_eq!(decision.intent, QueryIntent::Write);
    }

    #[test]
    fn test_validate_missing_sql() {
        let err = validate_decision(r#"{"database_name": "shop", "intent": "read"}"#).unwrap_err();
        assert!(err.to_string().contains("sql_query"));
    }

    #[test]
    fn test_validate_empty_sql() {
        let err = validate_decision(
            r#"{"database_name": "shop", "sql_query": "  ", "intent": "read"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sql_query"));
    }

    #[test]
    fn test_validate_invalid_intent() {
        let err = validate_decision(
            r#"{"database_name": "shop", "sql_query": "SELECT 1;", "intent": "maybe"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid intent 'maybe'"));
    }

    #[test]
    fn test_validate_normalizes_database_name() {
        let decision = validate_decision(
            r#"{"database_name": " Shop ", "sql_query": "SELECT 1;", "intent": "read"}"#,
        )
        .unwrap();
        assert_eq!(decision.database_name, "shop");
    }

    #[test]
    fn test_extract_json_from_fence() {
        let response = "Here is the decision:\n```json\n{\"database_name\": \"shop\", \"sql_query\": \"SELECT 1;\", \"intent\": \"read\"}\n```\nDone.";
        let decision = validate_decision(response).unwrap();
        assert_eq!(decision.database_name, "shop");
    }

    #[test]
    fn test_extract_json_embedded_in_prose() {
        let response = "Sure! {\"database_name\": \"shop\", \"sql_query\": \"SELECT 1;\", \"intent\": \"read\"} Hope that helps.";
        let decision = validate_decision(response).unwrap();
        assert_eq!(decision.sql, "SELECT 1;");
    }

    #[test]
    fn test_extract_json_none() {
        assert!(extract_json("no json here").is_none());
    }
}
