/// Chat engines - Gateway
mod cloud;
mod ollama;

pub use cloud::{CloudEngine, ProxyClient};
pub use ollama::{OllamaEngine, OllamaLoader};

use anyhow::Result;
use std::sync::Arc;

use crate::models::{ChatEngine, ChatMessage, FragmentStream, LocalEngine};

/// The engine a submission runs on. Both variants expose the same streaming
/// capability, so submission logic does not care which one it holds.
#[derive(Clone)]
pub enum Engine {
    Cloud(Arc<dyn ChatEngine>),
    Local(Arc<dyn LocalEngine>),
}

impl Engine {
    pub async fn stream_completion(&self, history: &[ChatMessage]) -> Result<FragmentStream> {
        match self {
            Engine::Cloud(engine) => engine.stream_completion(history).await,
            Engine::Local(engine) => engine.stream_completion(history).await,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Engine::Cloud(engine) => engine.name(),
            Engine::Local(engine) => engine.name(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Engine::Local(_))
    }
}
