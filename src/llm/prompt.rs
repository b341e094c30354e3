//! Prompt construction for the SQL agent.
//!
//! Builds the system prompt that embeds every registered database schema and
//! pins the model to a strict JSON output contract.

use crate::db::Schema;
use crate::llm::types::Message;

/// System prompt template for the SQL agent.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a SQL agent for MySQL databases. Decide which database a request targets, write the SQL for it, and classify the intent.

AVAILABLE DATABASES (use lowercase names exactly as shown):
{databases}

RULES:
1. Use only one database from the list above.
2. sql_query must be a single complete MySQL statement.
3. intent is 'read' for SELECT-style statements, 'write' for anything that modifies data or schema.
4. Never invent tables or columns that are not in the schemas.

OUTPUT FORMAT:
Return ONLY a JSON object with exactly these fields, no explanations:
{"database_name": "<name>", "sql_query": "<sql>", "intent": "read" | "write"}"#;

/// Builds the system prompt with every registered database schema injected.
///
/// Databases are rendered in the order given; callers pass them sorted by
/// name so the prompt is deterministic.
pub fn build_classifier_prompt(databases: &[(String, Schema)]) -> String {
    let sections: Vec<String> = databases
        .iter()
        .map(|(name, schema)| format!("Database Name: {}\n{}", name, schema.format_for_llm()))
        .collect();

    SYSTEM_PROMPT_TEMPLATE.replace("{databases}", &sections.join("\n---\n"))
}

/// Builds the complete message list for a classification request.
pub fn build_messages(databases: &[(String, Schema)], query: &str) -> Vec<Message> {
    vec![
        Message::system(build_classifier_prompt(databases)),
        Message::user(format!("User Query: {}", query)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Column, ForeignKey, Table};

    fn sample_schema() -> Schema {
        Schema {
            tables: vec![
                Table {
                    name: "customers".to_string(),
                    columns: vec![
                        Column::new("id", "int").nullable(false),
                        Column::new("email", "varchar(255)").nullable(false),
                        Column::new("name", "varchar(100)"),
                    ],
                    primary_key: vec!["id".to_string()],
                },
                Table {
                    name: "orders".to_string(),
                    columns: vec![
                        Column::new("id", "int").nullable(false),
                        Column::new("customer_id", "int").nullable(false),
                        Column::new("total", "decimal(10,2)").nullable(false),
                    ],
                    primary_key: vec!["id".to_string()],
                },
            ],
            foreign_keys: vec![ForeignKey::new(
                "orders",
                vec!["customer_id".to_string()],
                "customers",
                vec!["id".to_string()],
            )],
        }
    }

    #[test]
    fn test_prompt_contains_all_databases() {
        let databases = vec![
            ("shop".to_string(), sample_schema()),
            ("crm".to_string(), Schema::default()),
        ];

        let prompt = build_classifier_prompt(&databases);

        assert!(prompt.contains("Database Name: shop"));
        assert!(prompt.contains("Database Name: crm"));
        assert!(prompt.contains("Table: customers"));
        assert!(prompt.contains("Table: orders"));
    }

    #[test]
    fn test_prompt_contains_output_contract() {
        let prompt = build_classifier_prompt(&[]);

        assert!(prompt.contains("OUTPUT FORMAT:"));
        assert!(prompt.contains("database_name"));
        assert!(prompt.contains("sql_query"));
        assert!(prompt.contains("\"read\" | \"write\""));
    }

    #[test]
    fn test_build_messages_shape() {
        let databases = vec![("shop".to_string(), sample_schema())];
        let messages = build_messages(&databases, "List all customers");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, crate::llm::types::Role::System);
        assert_eq!(messages[1].role, crate::llm::types::Role::User);
        assert!(messages[1].content.contains("List all customers"));
    }
}
