//! Steward - a natural-language SQL assistant with write approval.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

use db_steward::classifier::IntentClassifier;
use db_steward::cli::Cli;
use db_steward::config::Config;
use db_steward::error::{Result, StewardError};
use db_steward::llm::{self, LlmProvider};
use db_steward::logging;
use db_steward::registry::ConnectionRegistry;
use db_steward::workflow::{ApprovalWorkflow, AskResult, VerificationSignal};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_to(&mut config)?;

    if config.databases.is_empty() {
        return Err(StewardError::config(
            "No databases configured. Add [databases.<name>] sections or pass --database.",
        ));
    }

    for connection in config.databases.values_mut() {
        connection.apply_env_defaults();
    }

    // All connections must be up and introspected before we take requests.
    let registry = Arc::new(ConnectionRegistry::new());
    registry.initialize(&config.databases).await?;
    info!("Initialized databases: {}", registry.names().join(", "));

    let provider: LlmProvider = config
        .llm
        .provider
        .parse()
        .map_err(StewardError::config)?;
    let llm_client = llm::create_client(provider, None)?;
    let classifier = IntentClassifier::new(llm_client);

    let workflow = ApprovalWorkflow::new(registry, classifier);

    repl(&workflow).await
}

/// Interactive loop: free text is a question, `approve`/`reject` resolve a
/// pending write by session id.
async fn repl(workflow: &ApprovalWorkflow) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print_line(
        &mut stdout,
        &format!(
            "steward ready. Databases: {}. Type a question, 'approve <id>', 'reject <id>', or 'quit'.",
            workflow.database_names().join(", ")
        ),
    )
    .await?;

    loop {
        stdout
            .write_all(b"> ")
            .await
            .map_err(|e| StewardError::internal(format!("stdout error: {}", e)))?;
        stdout
            .flush()
            .await
            .map_err(|e| StewardError::internal(format!("stdout error: {}", e)))?;

        let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| StewardError::internal(format!("stdin error: {}", e)))?
        else {
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match parse_command(line) {
            Command::Quit => break,
            Command::Ask(query) => workflow.ask(query).await,
            Command::Resolve(session_id, signal) => workflow.resolve(session_id, signal).await,
            Command::Invalid(message) => {
                print_line(&mut stdout, &message).await?;
                continue;
            }
        };

        print_result(&mut stdout, &result).await?;
    }

    Ok(())
}

enum Command<'a> {
    Ask(&'a str),
    Resolve(Uuid, VerificationSignal),
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> Command<'_> {
    if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
        return Command::Quit;
    }

    for (keyword, signal) in [
        ("approve", VerificationSignal::Approve),
        ("reject", VerificationSignal::Reject),
    ] {
        if let Some(rest) = strip_keyword(line, keyword) {
            return match rest.trim().parse::<Uuid>() {
                Ok(id) => Command::Resolve(id, signal),
                Err(_) => Command::Invalid(format!(
                    "Usage: {} <session-id> (a UUID from a pending verification)",
                    keyword
                )),
            };
        }
    }

    Command::Ask(line)
}

/// Strips a leading keyword followed by whitespace, case-insensitively.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let (head, rest) = line.split_at_checked(keyword.len())?;
    if head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

async fn print_result(stdout: &mut tokio::io::Stdout, result: &AskResult) -> Result<()> {
    print_line(stdout, &result.response_message).await
}

async fn print_line(stdout: &mut tokio::io::Stdout, message: &str) -> Result<()> {
    stdout
        .write_all(format!("{}\n", message).as_bytes())
        .await
        .map_err(|e| StewardError::internal(format!("stdout error: {}", e)))?;
    stdout
        .flush()
        .await
        .map_err(|e| StewardError::internal(format!("stdout error: {}", e)))
}
