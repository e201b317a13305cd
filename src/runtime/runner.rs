use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use super::interactive::run_repl;
use super::non_interactive::run_prompt;
use crate::{
    app::{load_config, load_config_from, Config},
    cli::{print_models, run_init, show_version, Cli, Commands},
    engine::{OllamaLoader, ProxyClient},
    server::serve,
    session::ChatSession,
};

/// Resolves configuration and dispatches the selected command
pub struct Runtime {
    command: Commands,
    config: Config,
}

impl Runtime {
    /// Create a runtime from CLI args
    pub fn new(cli: Cli) -> Result<Self> {
        let config = if let Some(config_path) = &cli.config {
            load_config_from(config_path)?
        } else {
            match load_config() {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config: {:#}. Using defaults.", e);
                    Config::default()
                }
            }
        };

        Ok(Self {
            command: cli.command.unwrap_or_default(),
            config,
        })
    }

    pub async fn run(mut self) -> Result<()> {
        match self.command.clone() {
            Commands::Serve { host, port } => {
                if let Some(host) = host {
                    self.config.server.host = host;
                }
                if let Some(port) = port {
                    self.config.server.port = port;
                }
                serve(&self.config).await
            }
            Commands::Chat {
                model,
                proxy_url,
                prompt,
            } => {
                if let Some(model) = model {
                    self.config.chat.default_model = model;
                }
                if let Some(proxy_url) = proxy_url {
                    self.config.client.proxy_url = proxy_url;
                }
                let session = self.build_session()?;
                match prompt {
                    Some(prompt) => run_prompt(&session, prompt).await,
                    None => run_repl(&session).await,
                }
            }
            Commands::Models => {
                print_models();
                Ok(())
            }
            Commands::Init => run_init(),
            Commands::Version => {
                show_version();
                Ok(())
            }
        }
    }

    fn build_session(&self) -> Result<ChatSession> {
        let cloud = ProxyClient::new(&self.config.client.proxy_url)?;
        debug!("Cloud models go through {}", cloud.endpoint());
        let loader = OllamaLoader::new(&self.config.ollama.base_url())?;
        Ok(ChatSession::new(
            &self.config.chat,
            Arc::new(cloud),
            Arc::new(loader),
        )?)
    }
}
