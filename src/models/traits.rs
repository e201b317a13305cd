use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::types::{ChatMessage, FragmentStream, ProgressCallback};

/// Core capability every chat backend provides
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Start a streamed completion over the full history.
    ///
    /// Setup failures (connection refused, non-success status) are returned
    /// directly; failures after the stream has started surface as an `Err`
    /// item in the stream.
    async fn stream_completion(&self, history: &[ChatMessage]) -> Result<FragmentStream>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// A model loaded on this machine. Holding one keeps the weights resident.
#[async_trait]
pub trait LocalEngine: ChatEngine {
    /// Release the model's memory
    async fn unload(&self) -> Result<()>;
}

/// Constructs local engines, downloading weights when needed
#[async_trait]
pub trait LocalEngineLoader: Send + Sync {
    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<Arc<dyn LocalEngine>>;
}

/// Hands out engines bound to a cloud model id. Cloud models need no
/// loading, so this is synchronous and infallible.
pub trait CloudConnector: Send + Sync {
    fn connect(&self, model_id: &str) -> Arc<dyn ChatEngine>;
}
