//! SQL intent derivation.
//!
//! Parses SQL with sqlparser and derives whether a statement is read-only or
//! mutating. The workflow trusts this derivation, not the model's own claim,
//! so a mislabeled write can never skip the approval checkpoint.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a SQL statement only reads data or mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryIntent {
    /// Read-only statements that execute immediately (SELECT, EXPLAIN, SHOW).
    Read,
    /// Mutating statements held for human approval (INSERT, UPDATE, DELETE,
    /// and anything else that is not provably read-only).
    Write,
}

impl QueryIntent {
    /// Returns true if statements with this intent are held for approval.
    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::Write)
    }

    /// Returns the intent as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Explain,
    Show,
    Merge,
    /// Multiple statements detected; contains the most dangerous kind.
    Multiple(Box<StatementKind>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Merge => write!(f, "MERGE"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of deriving the intent of a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentClassification {
    /// The derived intent.
    pub intent: QueryIntent,
    /// The kind of statement(s) detected.
    pub statement_kind: StatementKind,
}

/// Derives the intent of a SQL string from its statement verb(s).
///
/// Unparseable or empty SQL is treated as a write (conservative default), so
/// anything the parser cannot vouch for goes through approval. When the input
/// contains multiple statements, a single write makes the whole input a write.
pub fn classify_intent(sql: &str) -> IntentClassification {
    let dialect = MySqlDialect {};
    let statements = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => statements,
        Err(_) => {
            return IntentClassification {
                intent: QueryIntent::Write,
                statement_kind: StatementKind::Unknown,
            }
        }
    };

    if statements.is_empty() {
        return IntentClassification {
            intent: QueryIntent::Write,
            statement_kind: StatementKind::Unknown,
        };
    }

    if statements.len() == 1 {
        let (intent, kind) = classify_statement(&statements[0]);
        return IntentClassification {
            intent,
            statement_kind: kind,
        };
    }

    // Multiple statements: a single write makes the whole input a write
    let mut max_intent = QueryIntent::Read;
    let mut max_kind = StatementKind::Unknown;

    for stmt in &statements {
        let (intent, kind) = classify_statement(stmt);
        if intent == QueryIntent::Write && max_intent == QueryIntent::Read {
            max_intent = intent;
            max_kind = kind;
        } else if max_kind == StatementKind::Unknown {
            max_kind = kind;
        }
    }

    IntentClassification {
        intent: max_intent,
        statement_kind: StatementKind::Multiple(Box::new(max_kind)),
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> (QueryIntent, StatementKind) {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            if *analyze {
                // EXPLAIN ANALYZE executes the query - inherit inner intent
                let (inner_intent, _) = classify_statement(statement);
                (inner_intent, StatementKind::Explain)
            } else {
                // Plain EXPLAIN only shows the plan, doesn't execute
                (QueryIntent::Read, StatementKind::Explain)
            }
        }
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => (QueryIntent::Read, StatementKind::Show),

        // The three verbs the approval workflow exists for
        Statement::Insert(_) => (QueryIntent::Write, StatementKind::Insert),
        Statement::Update { .. } => (QueryIntent::Write, StatementKind::Update),
        Statement::Delete(_) => (QueryIntent::Write, StatementKind::Delete),
        Statement::Merge { .. } => (QueryIntent::Write, StatementKind::Merge),

        // DDL and everything else that changes state
        Statement::Drop { .. } => (QueryIntent::Write, StatementKind::Drop),
        Statement::Truncate { .. } => (QueryIntent::Write, StatementKind::Truncate),
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => (QueryIntent::Write, StatementKind::Alter),
        Statement::CreateTable(_)
        | Statement::CreateIndex(_)
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction(_)
        | Statement::CreateProcedure { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. } => (QueryIntent::Write, StatementKind::Create),

        // Conservative default: treat unknown statements as writes
        _ => (QueryIntent::Write, StatementKind::Unknown),
    }
}

/// Classifies a Query by recursively inspecting for data-modifying operations.
fn classify_query(query: &Query) -> (QueryIntent, StatementKind) {
    // Check CTEs in WITH clause
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let (intent, kind) = classify_query(&cte.query);
            if intent == QueryIntent::Write {
                return (intent, kind);
            }
        }
    }

    classify_set_expr(&query.body)
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> (QueryIntent, StatementKind) {
    match set_expr {
        // Direct mutations in CTE bodies (wrapped as Statement)
        SetExpr::Delete(stmt) => classify_statement(stmt),
        SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Insert(stmt) => classify_statement(stmt),
        SetExpr::Merge(stmt) => classify_statement(stmt),

        // Nested query - recurse
        SetExpr::Query(query) => classify_query(query),

        // SELECT - check FROM clause for subqueries
        SetExpr::Select(select) => classify_select(select),

        // Set operations (UNION, INTERSECT, EXCEPT) - check both sides
        SetExpr::SetOperation { left, right, .. } => {
            let (left_intent, left_kind) = classify_set_expr(left);
            if left_intent == QueryIntent::Write {
                return (left_intent, left_kind);
            }
            let (right_intent, right_kind) = classify_set_expr(right);
            if right_intent == QueryIntent::Write {
                (right_intent, right_kind)
            } else {
                (left_intent, left_kind)
            }
        }

        // Values, Table - safe (no subqueries possible)
        SetExpr::Values(_) | SetExpr::Table(_) => (QueryIntent::Read, StatementKind::Select),
    }
}

/// Classifies a Select by checking its FROM clause for subqueries.
fn classify_select(select: &Select) -> (QueryIntent, StatementKind) {
    for table_with_joins in &select.from {
        let (intent, kind) = classify_table_with_joins(table_with_joins);
        if intent == QueryIntent::Write {
            return (intent, kind);
        }
    }
    (QueryIntent::Read, StatementKind::Select)
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> (QueryIntent, StatementKind) {
    let (intent, kind) = classify_table_factor(&twj.relation);
    if intent == QueryIntent::Write {
        return (intent, kind);
    }

    for join in &twj.joins {
        let (intent, kind) = classify_table_factor(&join.relation);
        if intent == QueryIntent::Write {
            return (intent, kind);
        }
    }

    (QueryIntent::Read, StatementKind::Select)
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> (QueryIntent, StatementKind) {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        // Other variants (Table, TableFunction, etc.) are safe
        _ => (QueryIntent::Read, StatementKind::Select),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_intent(sql: &str, expected_intent: QueryIntent, expected_kind: StatementKind) {
        let result = classify_intent(sql);
        assert_eq!(
            result.intent, expected_intent,
            "SQL: '{}' - expected intent {:?}, got {:?}",
            sql, expected_intent, result.intent
        );
        assert_eq!(
            result.statement_kind, expected_kind,
            "SQL: '{}' - expected kind {:?}, got {:?}",
            sql, expected_kind, result.statement_kind
        );
    }

    // Read statements
    #[test]
    fn test_select_is_read() {
        assert_intent(
            "SELECT * FROM customers",
            QueryIntent::Read,
            StatementKind::Select,
        );
    }

    #[test]
    fn test_select_with_join_is_read() {
        assert_intent(
            "SELECT c.name, o.total FROM customers c JOIN orders o ON c.id = o.customer_id",
            QueryIntent::Read,
            StatementKind::Select,
        );
    }

    #[test]
    fn test_select_with_subquery_is_read() {
        assert_intent(
            "SELECT * FROM customers WHERE id IN (SELECT customer_id FROM orders)",
            QueryIntent::Read,
            StatementKind::Select,
        );
    }

    #[test]
    fn test_explain_is_read() {
        assert_intent(
            "EXPLAIN SELECT * FROM customers",
            QueryIntent::Read,
            StatementKind::Explain,
        );
    }

    #[test]
    fn test_explain_analyze_delete_is_write() {
        // EXPLAIN ANALYZE executes the inner statement
        assert_intent(
            "EXPLAIN ANALYZE DELETE FROM customers",
            QueryIntent::Write,
            StatementKind::Explain,
        );
    }

    #[test]
    fn test_show_is_read() {
        assert_intent("SHOW TABLES", QueryIntent::Read, StatementKind::Show);
    }

    // Write statements
    #[test]
    fn test_insert_is_write() {
        assert_intent(
            "INSERT INTO customers (name, email) VALUES ('Alice', 'alice@test.com')",
            QueryIntent::Write,
            StatementKind::Insert,
        );
    }

    #[test]
    fn test_update_is_write() {
        assert_intent(
            "UPDATE customers SET status = 'inactive' WHERE last_login < '2024-01-01'",
            QueryIntent::Write,
            StatementKind::Update,
        );
    }

    #[test]
    fn test_delete_is_write() {
        assert_intent(
            "DELETE FROM customers WHERE id=42",
            QueryIntent::Write,
            StatementKind::Delete,
        );
    }

    #[test]
    fn test_drop_is_write() {
        assert_intent(
            "DROP TABLE customers",
            QueryIntent::Write,
            StatementKind::Drop,
        );
    }

    #[test]
    fn test_truncate_is_write() {
        assert_intent(
            "TRUNCATE TABLE logs",
            QueryIntent::Write,
            StatementKind::Truncate,
        );
    }

    #[test]
    fn test_create_table_is_write() {
        assert_intent(
            "CREATE TABLE t (id INT PRIMARY KEY)",
            QueryIntent::Write,
            StatementKind::Create,
        );
    }

    // CTE queries
    #[test]
    fn test_cte_select_is_read() {
        assert_intent(
            "WITH active AS (SELECT * FROM customers WHERE active = true) SELECT * FROM active",
            QueryIntent::Read,
            StatementKind::Select,
        );
    }

    #[test]
    fn test_cte_with_delete_is_write() {
        assert_intent(
            "WITH deleted AS (DELETE FROM customers RETURNING *) SELECT * FROM deleted",
            QueryIntent::Write,
            StatementKind::Delete,
        );
    }

    #[test]
    fn test_nested_subquery_with_delete_is_write() {
        assert_intent(
            "SELECT * FROM (WITH d AS (DELETE FROM customers RETURNING *) SELECT * FROM d) sub",
            QueryIntent::Write,
            StatementKind::Delete,
        );
    }

    // Multi-statement inputs
    #[test]
    fn test_multi_statement_write_wins() {
        let result = classify_intent("SELECT * FROM customers; DELETE FROM logs");
        assert_eq!(result.intent, QueryIntent::Write);
        match result.statement_kind {
            StatementKind::Multiple(inner) => assert_eq!(*inner, StatementKind::Delete),
            _ => panic!("Expected Multiple statement kind"),
        }
    }

    #[test]
    fn test_multi_statement_all_reads() {
        let result = classify_intent("SELECT * FROM customers; SELECT COUNT(*) FROM orders");
        assert_eq!(result.intent, QueryIntent::Read);
    }

    // Parse failure handling
    #[test]
    fn test_parse_failure_is_write() {
        let result = classify_intent("THIS IS NOT VALID SQL AT ALL");
        assert_eq!(result.intent, QueryIntent::Write);
        assert_eq!(result.statement_kind, StatementKind::Unknown);
    }

    #[test]
    fn test_empty_sql_is_write() {
        let result = classify_intent("");
        assert_eq!(result.intent, QueryIntent::Write);
    }

    #[test]
    fn test_case_insensitive() {
        assert_intent(
            "select * from customers",
            QueryIntent::Read,
            StatementKind::Select,
        );
        assert_intent(
            "DeLeTe FrOm customers",
            QueryIntent::Write,
            StatementKind::Delete,
        );
    }

    #[test]
    fn test_requires_approval() {
        assert!(!QueryIntent::Read.requires_approval());
        assert!(QueryIntent::Write.requires_approval());
    }

    #[test]
    fn test_intent_serde_roundtrip() {
        let json = serde_json::to_string(&QueryIntent::Write).unwrap();
        assert_eq!(json, "\"write\"");
        let parsed: QueryIntent = serde_json::from_str("\"read\"").unwrap();
        assert_eq!(parsed, QueryIntent::Read);
    }
}
