//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod model_list;
pub mod render;
pub mod say;
pub mod settings;
pub mod users;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use crate::api::client::HttpBackend;
use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::render::{print_entries, print_status};
use crate::cli::say::run_say;
use crate::cli::settings::{run_set, run_unset};
use crate::cli::users::list_users;
use crate::core::config::data::BACKEND_URL_ENV;
use crate::core::config::Config;
use crate::core::session::ConsoleSession;
use crate::core::storage::FileStore;
use crate::utils::logging::TranscriptLog;
use crate::utils::trace::init_tracing;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("VERGEN_BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "chatops")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal console for chatting with hosted or local AI models")]
#[command(
    long_about = "chatops talks to a routing backend that forwards each message either to a \
hosted completion API or to a local model server. Preferences and the conversation are \
kept per namespace and survive restarts.\n\n\
Environment Variables:\n\
  CHATOPS_BACKEND_URL   Backend base URL (overrides config.toml)\n\
  CHATOPS_LOG           Diagnostic filter, e.g. 'debug' or 'chatops=trace'\n\n\
Console commands:\n\
  /help             List console commands\n\
  /provider <name>  Switch between 'hosted' and 'local'\n\
  /refresh          Re-fetch the local model list\n\
  /reset            Start the conversation over\n\
  /quit             Leave the console"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Namespace that keeps preferences and history apart
    #[arg(long, global = true, value_name = "NAME")]
    pub namespace: Option<String>,

    /// Backend base URL, e.g. http://localhost:8000
    #[arg(long, global = true, value_name = "URL")]
    pub backend: Option<String>,

    /// Append the conversation to the given file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,

    /// Print debug diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive console (default)
    Chat,
    /// Send one message and print the reply
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List the models the local server offers
    Models,
    /// Show the users known to the backend
    Users,
    /// Show provider, model and backend health
    Status,
    /// Print the stored conversation
    History {
        /// Only show the newest N entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Clear the stored conversation
    Reset,
    /// Set a preference or configuration value; lists everything without a value
    Set {
        key: Option<String>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Restore a preference or configuration value to its default
    Unset { key: String },
}

/// Everything a command needs, built once from flags and config.
pub struct CliContext {
    pub config: Config,
    pub backend_url: String,
    pub session: Arc<ConsoleSession>,
}

impl CliContext {
    pub fn open(args: &Args) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let env_url = std::env::var(BACKEND_URL_ENV).ok();
        let backend_url = config.resolve_backend_url(args.backend.as_deref(), env_url.as_deref());

        let storage_root = config.storage_root()?;
        debug!(backend = %backend_url, storage = %storage_root.display(), "opening session");

        let store = Arc::new(FileStore::new(storage_root));
        let backend = Arc::new(HttpBackend::new(backend_url.clone()));
        let session = ConsoleSession::open(
            store,
            backend,
            config.session_options(args.namespace.as_deref()),
        );

        Ok(Self {
            config,
            backend_url,
            session: Arc::new(session),
        })
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let ctx = CliContext::open(&args)?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let transcript = TranscriptLog::new(args.log)?;
            run_chat(&ctx, transcript).await
        }
        Commands::Say { prompt } => run_say(&ctx, prompt).await,
        Commands::Models => list_models(&ctx).await,
        Commands::Users => list_users(&ctx).await,
        Commands::Status => {
            ctx.session.refresh_models().await;
            ctx.session.poll_health().await;
            print_status(&ctx.session.status(), &ctx.backend_url);
            Ok(())
        }
        Commands::History { limit } => {
            let entries = ctx.session.entries();
            let start = limit.map_or(0, |limit| entries.len().saturating_sub(limit));
            print_entries(&entries[start..]);
            Ok(())
        }
        Commands::Reset => {
            ctx.session.reset();
            println!("✅ Conversation reset");
            Ok(())
        }
        Commands::Set { key, value } => {
            let value = value.map(|parts| parts.join(" "));
            if let Err(err) = run_set(&ctx, key.as_deref(), value.as_deref()) {
                err.print();
                std::process::exit(err.exit_code());
            }
            Ok(())
        }
        Commands::Unset { key } => {
            if let Err(err) = run_unset(&ctx, &key) {
                err.print();
                std::process::exit(err.exit_code());
            }
            Ok(())
        }
    }
}
