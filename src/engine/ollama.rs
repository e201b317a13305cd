use anyhow::{Context as _, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{HTTP_CONNECT_TIMEOUT_SECS, OLLAMA_PULL_TIMEOUT_SECS};
use crate::models::{
    ChatEngine, ChatMessage, FragmentStream, LocalEngine, LocalEngineLoader, ProgressCallback,
};
use crate::utils::{DeepSearchError, LineBuffer, Utf8ChunkDecoder};

/// Loads models into a local Ollama server, pulling weights on first use
#[derive(Debug, Clone)]
pub struct OllamaLoader {
    client: Client,
    base_url: String,
}

impl OllamaLoader {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn pull(&self, model_id: &str, progress: &ProgressCallback) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .timeout(Duration::from_secs(OLLAMA_PULL_TIMEOUT_SECS))
            .json(&json!({ "model": model_id, "stream": true }))
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}. Is it running?", self.base_url))?;
        let response = check_status(response).await?;

        let mut lines = ndjson_lines(response);
        while let Some(line) = lines.next().await {
            let update: PullStatus = serde_json::from_str(&line?)?;
            if let Some(error) = update.error {
                anyhow::bail!(DeepSearchError::EngineError(error));
            }
            progress(&update.describe());
        }
        Ok(())
    }

    /// Load the weights into memory without generating anything
    async fn warm(&self, model_id: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({ "model": model_id, "stream": false }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalEngineLoader for OllamaLoader {
    async fn load(&self, model_id: &str, progress: ProgressCallback) -> Result<Arc<dyn LocalEngine>> {
        info!("Loading local model {}", model_id);
        progress(&format!("Preparing {}", model_id));

        self.pull(model_id, &progress).await?;
        progress(&format!("Loading {} into memory", model_id));
        self.warm(model_id).await?;
        progress(&format!("{} ready", model_id));

        Ok(Arc::new(OllamaEngine {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            model: model_id.to_string(),
        }))
    }
}

/// A model resident in the local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaEngine {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    message: Option<OllamaDelta>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaDelta {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: String,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

impl PullStatus {
    fn describe(&self) -> String {
        match (self.total, self.completed) {
            (Some(total), Some(completed)) if total > 0 => {
                format!("{} ({}%)", self.status, completed * 100 / total)
            }
            _ => self.status.clone(),
        }
    }
}

/// Parse one streamed chat line into a fragment
fn parse_chat_line(line: &str) -> Result<Option<String>> {
    let chunk: OllamaChatChunk =
        serde_json::from_str(line).context("Malformed response from Ollama")?;
    if let Some(error) = chunk.error {
        anyhow::bail!(DeepSearchError::EngineError(error));
    }
    Ok(chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty()))
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_else(|_| format!("Ollama request failed with status {}", status));
    Err(DeepSearchError::EngineError(message).into())
}

/// Split a streamed NDJSON body into non-empty lines
fn ndjson_lines(response: Response) -> futures::stream::BoxStream<'static, Result<String>> {
    let mut bytes = response.bytes_stream();
    let stream = async_stream::stream! {
        let mut utf8 = Utf8ChunkDecoder::new();
        let mut lines = LineBuffer::new();
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in lines.push(&utf8.decode(&chunk)) {
                        if !line.trim().is_empty() {
                            yield Ok(line);
                        }
                    }
                }
                Err(e) => {
                    yield Err(anyhow::Error::from(e));
                    return;
                }
            }
        }
        let tail = utf8.finish();
        let mut rest = lines.push(&tail);
        rest.extend(lines.finish());
        for line in rest {
            if !line.trim().is_empty() {
                yield Ok(line);
            }
        }
    };
    Box::pin(stream)
}

#[async_trait]
impl ChatEngine for OllamaEngine {
    async fn stream_completion(&self, history: &[ChatMessage]) -> Result<FragmentStream> {
        debug!(model = %self.model, messages = history.len(), "local completion");
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&OllamaChatRequest {
                model: &self.model,
                messages: history,
                stream: true,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", self.base_url))?;
        let response = check_status(response).await?;

        let fragments = ndjson_lines(response).filter_map(|line| async move {
            match line.and_then(|l| parse_chat_line(&l)) {
                Ok(Some(text)) => Some(Ok(text)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::pin(fragments))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LocalEngine for OllamaEngine {
    async fn unload(&self) -> Result<()> {
        info!("Unloading local model {}", self.model);
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({ "model": self.model, "keep_alive": 0 }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}
