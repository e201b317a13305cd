use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deep-search")]
#[command(version)]
#[command(about = "Chat with cloud or local models through one streaming interface", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the chat proxy route server
    Serve {
        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Start a chat session (default)
    Chat {
        /// Model id to start with (see `deep-search models`)
        #[arg(short, long)]
        model: Option<String>,

        /// Proxy route base URL (overrides config)
        #[arg(long, env = "DEEP_SEARCH_PROXY_URL")]
        proxy_url: Option<String>,

        /// Submit one prompt, print the reply and exit
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// List available models
    Models,
    /// Initialize configuration
    Init,
    /// Show version information
    Version,
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Chat {
            model: None,
            proxy_url: None,
            prompt: None,
        }
    }
}
