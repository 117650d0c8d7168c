//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments and dispatches into the chat
//! loop or one of the utility subcommands.

pub mod agent_list;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::api::client::BankingClient;
use crate::cli::agent_list::list_agents;
use crate::core::config::Config;
use crate::core::session::{ChatController, DEFAULT_USER_ID};
use crate::core::store::{self, FileStore, HistoryStore};
use crate::ui::chat_loop::run_chat;

#[derive(Parser)]
#[command(name = "teller")]
#[command(about = "A terminal chat client for a multi-specialist banking assistant")]
#[command(
    long_about = "Teller is a full-screen terminal chat interface for a banking assistant \
backend. Questions are routed server-side to the appropriate specialist agent and \
responses are attributed to whichever specialist answered.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Ctrl+F            Search the transcript (Enter/Shift+Tab to cycle matches)\n\
  Ctrl+E            Export the session to a JSON file\n\
  Ctrl+L            Clear the session\n\
  Esc               Close search / dismiss the error banner\n\
  Up/Down/Mouse     Scroll through chat history\n\
  Ctrl+C            Quit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Backend base URL (overrides the config file)
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// User identifier sent with chat requests
    #[arg(short = 'u', long, global = true, value_name = "USER")]
    pub user: Option<String>,

    /// Session identifier; resuming an id restores its history
    #[arg(short = 's', long, global = true, value_name = "SESSION")]
    pub session: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// List the available specialist agents
    Agents,
    /// Check backend liveness
    Health,
    /// Print a session's export artifact as JSON
    Export {
        /// Session identifier to export
        session_id: String,
    },
    /// Remove a session's persisted history
    Clear {
        /// Session identifier to clear
        session_id: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    let endpoint = args
        .endpoint
        .unwrap_or_else(|| config.endpoint().to_string());
    let user_id = args
        .user
        .or_else(|| config.user_id.clone())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let client = BankingClient::new(&endpoint);
            report_backend_health(&client).await;

            let session_id = args
                .session
                .unwrap_or_else(ChatController::generate_session_id);
            let store = FileStore::new()?;
            let mut controller =
                ChatController::new(session_id, user_id, Box::new(store));
            controller.seed_welcome();

            run_chat(controller, client).await
        }
        Commands::Agents => {
            let client = BankingClient::new(&endpoint);
            list_agents(&client).await
        }
        Commands::Health => {
            let client = BankingClient::new(&endpoint);
            let health = client.check_health().await?;
            println!("{}: {}", health.status, health.message);
            Ok(())
        }
        Commands::Export { session_id } => {
            let store = FileStore::new()?;
            let messages = store.load(&session_id);
            let artifact = store::export(&session_id, &messages);
            println!("{}", serde_json::to_string_pretty(&artifact)?);
            Ok(())
        }
        Commands::Clear { session_id } => {
            let store = FileStore::new()?;
            store.clear(&session_id)?;
            println!("Cleared history for {session_id}");
            Ok(())
        }
    }
}

/// Startup liveness probe. A down backend is reported but does not prevent
/// the chat loop from starting; individual sends will surface failures.
async fn report_backend_health(client: &BankingClient) {
    match client.check_health().await {
        Ok(health) => tracing::info!(status = %health.status, "backend reachable"),
        Err(error) => eprintln!("Warning: backend health check failed: {error}"),
    }
}
