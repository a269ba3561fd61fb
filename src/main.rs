mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CacheCommands, Cli, Commands};
use crate::ui::Console;
use manus::config::get_settings;
use manus::llm::{create_llm, Message};
use manus::storage::get_redis;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = get_settings();
    let level = match (&settings, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(settings), false) => settings.log_level.to_lowercase(),
        (Err(_), false) => "info".to_string(),
    };
    init_tracing(&level);

    let settings = settings.context("Failed to load settings")?;
    let console = Console::new();

    match cli.command {
        Commands::Config { raw } => {
            if raw {
                print!("{}", toml::to_string_pretty(&settings.masked())?);
            } else {
                console.show_config(&settings);
            }
        }
        Commands::Chat { message, system } => {
            let llm = create_llm(&settings)?;

            let mut messages = Vec::with_capacity(2);
            if let Some(system) = system {
                messages.push(Message::system(system));
            }
            messages.push(Message::user(message));

            let reply = llm.ask(&messages, None, None, None).await?;
            console.assistant_message(llm.model_name(), &reply);
        }
        Commands::Cache { command } => match command {
            CacheCommands::Ping => {
                let redis = get_redis()?;
                console.info("Connecting to Redis...");
                if let Err(e) = redis.initialize().await {
                    console.error(&e.to_string());
                    return Err(e.into());
                }
                console.success("Redis is reachable");
                redis.shutdown().await?;
            }
        },
    }

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("manus={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
