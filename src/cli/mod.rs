//! Command-line entrypoints: `serve` runs the API server; `token`
//! manages API tokens from the shell.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::core::config::Config;
use crate::core::llm::LlmProvider;
use crate::core::llm::openai::OpenAiProvider;
use crate::core::store::StudyStore;
use crate::core::terminal::{print_error, print_info, print_status, print_success};
use crate::logging::LogBroadcastWriter;

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = Config::from_env();

    match args.get(1).map(|s| s.as_str()) {
        None | Some("serve") => serve(config).await,
        Some("token") => token_command(&config, &args[2..]).await,
        Some("help") | Some("--help") | Some("-h") => {
            print_help();
            Ok(())
        }
        Some(other) => {
            print_error(&format!("Unknown command: {}", other));
            print_help();
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let (log_tx, _) = tokio::sync::broadcast::channel::<String>(500);
    let make_writer = LogBroadcastWriter {
        sender: log_tx.clone(),
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;

    let store = StudyStore::open(&config.data_dir).await?;
    let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
        &api_key,
        &config.openai_base_url,
        &config.model,
    ));
    info!("LLM provider: {} ({})", llm.provider_id(), config.model);

    crate::interfaces::web::serve(&config, store, llm, log_tx).await
}

async fn token_command(config: &Config, args: &[String]) -> Result<()> {
    let store = StudyStore::open(&config.data_dir).await?;

    match args.first().map(|s| s.as_str()) {
        Some("create") => {
            let name = args.get(1).map(|s| s.as_str()).unwrap_or("default");
            let (raw, record) = store.create_api_token(name).await?;
            print_success(&format!("Created token '{}'", record.name));
            print_status("Token", &raw);
            print_info("Store it now; only its hash is kept.");
            Ok(())
        }
        Some("list") => {
            let tokens = store.list_api_tokens().await?;
            if tokens.is_empty() {
                print_info("No API tokens configured.");
            }
            for token in tokens {
                print_status(&token.name, &format!("{} ({})", token.id, token.created_at));
            }
            Ok(())
        }
        Some("revoke") => {
            let id = args
                .get(1)
                .ok_or_else(|| anyhow!("Usage: cram token revoke <id>"))?;
            if store.delete_api_token(id).await? {
                print_success("Token revoked.");
            } else {
                print_error("Token not found.");
            }
            Ok(())
        }
        _ => {
            print_error("Usage: cram token <create|list|revoke>");
            Ok(())
        }
    }
}

fn print_help() {
    println!("cram - study assistant API server");
    println!();
    println!("Usage:");
    println!("  cram [serve]             Run the API server (default)");
    println!("  cram token create <name> Mint an API token");
    println!("  cram token list          List API tokens");
    println!("  cram token revoke <id>   Revoke an API token");
    println!();
    println!("Environment:");
    println!("  CRAM_DATA_DIR, CRAM_API_HOST, CRAM_API_PORT,");
    println!("  OPENAI_API_KEY, CRAM_OPENAI_BASE_URL, CRAM_MODEL");
}
