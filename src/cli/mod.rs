use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "manus")]
#[command(author = "Manus Backend Team")]
#[command(version)]
#[command(about = "Manus backend infrastructure: settings, LLM providers, Redis", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the resolved configuration (secrets masked)
    Config {
        /// Print as TOML instead of a summary
        #[arg(long)]
        raw: bool,
    },

    /// Send one message to the configured LLM provider
    Chat {
        /// The message to send
        #[arg(required = true)]
        message: String,

        /// Optional system prompt
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Redis cache commands
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Connect to REDIS_URL, probe it and disconnect
    Ping,
}
