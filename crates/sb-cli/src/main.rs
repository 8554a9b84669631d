//! silentbot: SilentBot Main Binary
//!
//! Usage:
//!   silentbot                                Start interactive CLI mode
//!   silentbot --headless --prompt "<text>"   Run one turn and print the reply
//!   silentbot --help                         Show help

mod cli;

use std::sync::Arc;

use sb_core::catalog::KnowledgeCatalog;
use sb_core::{ChatService, Config, LlmAgent, Store, identity};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    /// Interactive CLI mode
    Interactive,
    /// One-shot turn
    Headless { prompt: Option<String> },
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = parse_args(std::env::args().skip(1));

    let mode = match mode {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("silentbot {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        other => other,
    };

    // Warnings only by default so the shell stays readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting silentbot...");
    tracing::info!("Model: {}", config.llm.model);

    let store = Store::open(&config.storage.db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let catalog = KnowledgeCatalog::from_json_file(&config.knowledge.catalog_path)
        .map_err(|e| anyhow::anyhow!("Failed to load knowledge catalog: {}", e))?
        .with_policy();
    store
        .load_knowledge(catalog.entries())
        .map_err(|e| anyhow::anyhow!("Failed to index knowledge catalog: {}", e))?;

    let agent = LlmAgent::new(&config.llm)
        .map_err(|e| anyhow::anyhow!("Failed to create LLM client: {}", e))?;

    let user_id = identity::load_or_create(&config.storage.identity_path)
        .map_err(|e| anyhow::anyhow!("Failed to load identity: {}", e))?;

    let chat = ChatService::new(store, Arc::new(agent)).with_unlock_code(config.unlock_code());
    let username = format!("cli_{}", user_id.chars().take(8).collect::<String>());
    let user = chat.ensure_user(&user_id, &username, "cli")?;

    match mode {
        RunMode::Headless { prompt } => match prompt {
            Some(prompt) => cli::run_headless(&chat, &user, &prompt).await,
            None => anyhow::bail!("--headless requires --prompt <text>"),
        },
        _ => cli::run_cli(&chat, user, &config).await,
    }
}

/// Parse command line arguments
fn parse_args(args: impl IntoIterator<Item = String>) -> RunMode {
    let mut headless = false;
    let mut prompt = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--headless" => headless = true,
            "--prompt" | "-p" => prompt = args.next(),
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    if headless {
        RunMode::Headless { prompt }
    } else {
        RunMode::Interactive
    }
}

/// Print help message
fn print_help() {
    println!("silentbot - conversational assistant with persistent memory");
    println!();
    println!("Usage:");
    println!("  silentbot                               Start interactive CLI mode");
    println!("  silentbot --headless --prompt <text>    Run one turn and print the reply");
    println!("  silentbot --help                        Show this help message");
    println!("  silentbot --version                     Show version");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY              API key (required)");
    println!("  LLM_MODEL                Model name (default: claude-sonnet-4-20250514)");
    println!("  LLM_PRO_MODEL            Model used for pro users");
    println!("  LLM_PROVIDER             Provider: claude or openai (default: claude)");
    println!("  LLM_BASE_URL             Custom API endpoint");
    println!("  SILENTBOT_DB_PATH        SQLite database (default: data/silentbot.db)");
    println!("  SILENTBOT_IDENTITY_PATH  Identity file (default: cli_user.id)");
    println!("  SILENTBOT_CATALOG_PATH   Knowledge catalog (default: data/knowledge.json)");
    println!("  PRO_UNLOCK_CODE          Code accepted by /unlock");
}
