mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use memogenius::config::MemoConfig;
use memogenius::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memogenius", version, about = "Personal assistant backend: reminders, lists, memory, search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server and the reminder scheduler
    Serve,
    /// Chat with the assistant from the terminal
    Chat {
        /// Owner identifier: channel id, web token, or internal user id
        #[arg(long)]
        user: String,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Deliver any due reminders once and exit
    RemindCheck,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user and print its access key
    Create {
        #[arg(long)]
        channel_id: Option<i64>,
    },
    /// Show a user by any of its identifiers
    Show { identifier: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = MemoConfig::load()?;

    // Log to stderr so stdout stays clean for the chat REPL.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Chat { user } => cli::chat(config, &user).await?,
        Command::User { action } => match action {
            UserAction::Create { channel_id } => cli::user_create(&config, channel_id)?,
            UserAction::Show { identifier } => cli::user_show(&config, &identifier)?,
        },
        Command::RemindCheck => cli::remind_check(&config).await?,
    }

    Ok(())
}
