//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::error::{Result, StewardError};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the given provider.
///
/// If `api_key` is provided, it takes precedence over environment variables.
/// For OpenAI, the key is resolved in order:
/// 1. Provided `api_key` parameter
/// 2. `OPENAI_API_KEY` environment variable
///
/// Model selection is controlled by `OPENAI_MODEL` (defaults to "gpt-4o").
pub fn create_client(provider: LlmProvider, api_key: Option<String>) -> Result<Box<dyn LlmClient>> {
    match provider {
        LlmProvider::OpenAi => {
            let key = api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| {
                    StewardError::llm(
                        "No API key configured. Set llm.api_key in the config or OPENAI_API_KEY.",
                    )
                })?;
            let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
            Ok(Box::new(OpenAiClient::new(OpenAiConfig::new(key, model))?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}
