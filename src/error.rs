//! Error types for db-steward.
//!
//! Defines the main error enum used throughout the application. The first
//! five variants form the user-visible taxonomy of the approval workflow;
//! the rest cover configuration and infrastructure failures.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for steward operations.
#[derive(Error, Debug)]
pub enum StewardError {
    /// The decision targets a database name not present in the registry.
    #[error("Unknown database: '{0}' is not an initialized connection")]
    UnknownDatabase(String),

    /// The LLM output could not be validated into an agent decision.
    #[error("Classification error: {0}")]
    Classification(String),

    /// An approval or rejection referenced a missing, expired, or
    /// already-consumed session.
    #[error("Unknown or expired session: {0}")]
    UnknownOrExpiredSession(Uuid),

    /// A transition was attempted on a session that is no longer pending.
    #[error("Invalid transition: session {session_id} is already {status}")]
    InvalidTransition { session_id: Uuid, status: String },

    /// SQL execution failed at the driver (syntax, constraint, connectivity).
    #[error("Execution error: {0}")]
    Execution(String),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// LLM API errors (rate limits, auth, timeouts, etc.)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StewardError {
    /// Creates a classification error with the given message.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownDatabase(_) => "Unknown Database",
            Self::Classification(_) => "Classification Error",
            Self::UnknownOrExpiredSession(_) => "Unknown Session",
            Self::InvalidTransition { .. } => "Invalid Transition",
            Self::Execution(_) => "Execution Error",
            Self::Connection(_) => "Connection Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using StewardError.
pub type Result<T> = std::result::Result<T, StewardError>;
