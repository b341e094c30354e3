//! The approval workflow.
//!
//! Ties classification, session parking, and execution together. Reads run
//! immediately; writes are parked in the session store and only execute
//! after a human approves them. Approval consumes the session before the
//! SQL runs, so a failed write can never be replayed with the same id.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::classifier::{AgentDecision, IntentClassifier};
use crate::error::StewardError;
use crate::executor::QueryExecutor;
use crate::intent::QueryIntent;
use crate::registry::ConnectionRegistry;
use crate::session::{SessionStore, VerificationStatus};

/// Outcome category of an ask or resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AskStatus {
    /// The statement executed and produced a result.
    Success,
    /// A write is parked and waiting for approval.
    PendingVerification,
    /// The request was rejected by a human.
    Aborted,
    /// Classification, routing, or execution failed.
    Error,
}

/// Human decision on a pending write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationSignal {
    Approve,
    Reject,
}

/// Result returned to the caller for every request.
#[derive(Debug, Clone, Serialize)]
pub struct AskResult {
    /// Session id, present only while a write awaits verification.
    pub session_id: Option<Uuid>,
    pub status: AskStatus,
    pub response_message: String,
    /// The SQL held for approval, echoed so the human can review it.
    pub proposed_sql: Option<String>,
    pub database_name: Option<String>,
}

impl AskResult {
    fn success(message: String) -> Self {
        Self {
            session_id: None,
            status: AskStatus::Success,
            response_message: message,
            proposed_sql: None,
            database_name: None,
        }
    }

    fn aborted(message: String) -> Self {
        Self {
            session_id: None,
            status: AskStatus::Aborted,
            response_message: message,
            proposed_sql: None,
            database_name: None,
        }
    }

    fn error(err: StewardError) -> Self {
        Self {
            session_id: None,
            status: AskStatus::Error,
            response_message: err.to_string(),
            proposed_sql: None,
            database_name: None,
        }
    }
}

/// Where a classified decision goes next.
///
/// Write execution is deliberately not constructible from classification:
/// the only path to a write reaching the database is through an approved
/// session.
enum Route {
    ExecuteRead(AgentDecision),
    HoldForVerification(AgentDecision),
}

impl Route {
    fn for_decision(decision: AgentDecision) -> Self {
        match decision.intent {
            QueryIntent::Read => Self::ExecuteRead(decision),
            QueryIntent::Write => Self::HoldForVerification(decision),
        }
    }
}

/// Orchestrates classify, park, and execute.
pub struct ApprovalWorkflow {
    registry: Arc<ConnectionRegistry>,
    classifier: IntentClassifier,
    executor: QueryExecutor,
    sessions: SessionStore,
}

impl ApprovalWorkflow {
    /// Creates a workflow with the default session TTL.
    pub fn new(registry: Arc<ConnectionRegistry>, classifier: IntentClassifier) -> Self {
        Self::with_sessions(registry, classifier, SessionStore::new())
    }

    /// Creates a workflow over a caller-provided session store.
    pub fn with_sessions(
        registry: Arc<ConnectionRegistry>,
        classifier: IntentClassifier,
        sessions: SessionStore,
    ) -> Self {
        let executor = QueryExecutor::new(Arc::clone(&registry));
        Self {
            registry,
            classifier,
            executor,
            sessions,
        }
    }

    /// Handles a natural-language request.
    ///
    /// Reads execute immediately. Writes are parked and the result carries
    /// the session id, target database, and proposed SQL for review.
    pub async fn ask(&self, query: &str) -> AskResult {
        if self.registry.is_empty() {
            return AskResult::error(StewardError::config(
                "No databases initialized. Check the configuration.",
            ));
        }

        let decision = match self
            .classifier
            .classify(query, &self.registry.schemas())
            .await
        {
            Ok(decision) => decision,
            Err(e) => return AskResult::error(e),
        };

        if !self.registry.contains(&decision.database_name) {
            return AskResult::error(StewardError::UnknownDatabase(decision.database_name));
        }

        info!(
            database = %decision.database_name,
            intent = decision.intent.as_str(),
            "Request classified"
        );

        match Route::for_decision(decision) {
            Route::ExecuteRead(decision) => {
                match self
                    .executor
                    .run_read(&decision.database_name, &decision.sql)
                    .await
                {
                    Ok(rendered) => {
                        AskResult::success(render_response(query, &decision.sql, rendered))
                    }
                    Err(e) => AskResult::error(e),
                }
            }
            Route::HoldForVerification(decision) => {
                let session_id = self
                    .sessions
                    .put(&decision.database_name, &decision.sql, query);

                let message = format!(
                    "Proposed data modification requires your approval.\n\
                     Database: {}\n\
                     Proposed SQL: {}\n\
                     Approve or reject with session id {}.",
                    decision.database_name, decision.sql, session_id
                );

                AskResult {
                    session_id: Some(session_id),
                    status: AskStatus::PendingVerification,
                    response_message: message,
                    proposed_sql: Some(decision.sql),
                    database_name: Some(decision.database_name),
                }
            }
        }
    }

    /// Resolves a pending write with a human decision.
    ///
    /// The session is consumed by the transition before any SQL runs:
    /// exactly one approve or reject wins, and an execution failure after
    /// approval still leaves the session spent.
    pub async fn resolve(&self, session_id: Uuid, signal: VerificationSignal) -> AskResult {
        let target = match signal {
            VerificationSignal::Approve => VerificationStatus::Approved,
            VerificationSignal::Reject => VerificationStatus::Rejected,
        };

        // A session that already reached a terminal status is as gone as one
        // that never existed; the caller sees both as unknown or expired.
        let record = match self.sessions.transition(session_id, target) {
            Ok(record) => record,
            Err(StewardError::InvalidTransition { .. }) => {
                return AskResult::error(StewardError::UnknownOrExpiredSession(session_id))
            }
            Err(e) => return AskResult::error(e),
        };

        match signal {
            VerificationSignal::Approve => {
                info!(session_id = %session_id, database = %record.database_name, "Write approved");
                match self
                    .executor
                    .run_write(&record.database_name, &record.sql)
                    .await
                {
                    Ok(summary) => AskResult::success(render_response(
                        &record.query,
                        &record.sql,
                        format!(
                            "Approved and executed on '{}'. {}",
                            record.database_name, summary
                        ),
                    )),
                    Err(e) => AskResult::error(e),
                }
            }
            VerificationSignal::Reject => {
                info!(session_id = %session_id, "Write rejected");
                AskResult::aborted(format!(
                    "Operation aborted. The proposed SQL was discarded: {}",
                    record.sql
                ))
            }
        }
    }

    /// Sorted names of the databases this workflow can target.
    pub fn database_names(&self) -> Vec<String> {
        self.registry.names()
    }
}

/// Prepends the executed SQL to the result when the request asked for it.
///
/// A request mentioning "sql query" gets the statement echoed in a fenced
/// block ahead of the result summary.
fn render_response(query: &str, sql: &str, summary: String) -> String {
    if query.to_lowercase().contains("sql query") {
        format!("SQL Query:\n```sql\n{}\n```\n\n{}", sql, summary)
    } else {
        summary
    }
}
