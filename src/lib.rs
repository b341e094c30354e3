//! db-steward - a natural-language SQL assistant with human-in-the-loop
//! write approval.
//!
//! Requests are classified by an LLM into a target database, a SQL
//! statement, and an intent. Reads execute immediately; writes are parked
//! under a session id until a human approves or rejects them.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod executor;
pub mod intent;
pub mod llm;
pub mod logging;
pub mod registry;
pub mod session;
pub mod workflow;

pub use error::{Result, StewardError};
