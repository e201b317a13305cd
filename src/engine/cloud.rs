use anyhow::{Context as _, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{CHAT_ROUTE, HTTP_CONNECT_TIMEOUT_SECS};
use crate::models::{ChatEngine, ChatMessage, CloudConnector, FragmentStream};
use crate::utils::{DeepSearchError, Utf8ChunkDecoder};

/// Talks to the proxy route server and hands out per-model cloud engines
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    endpoint: String,
}

impl ProxyClient {
    pub fn new(proxy_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", proxy_url.trim_end_matches('/'), CHAT_ROUTE),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CloudConnector for ProxyClient {
    fn connect(&self, model_id: &str) -> Arc<dyn ChatEngine> {
        Arc::new(CloudEngine {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            model: model_id.to_string(),
        })
    }
}

/// A cloud model reached through the proxy route. Always ready.
#[derive(Debug, Clone)]
pub struct CloudEngine {
    client: Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ProxyRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
}

#[derive(Deserialize)]
struct ProxyErrorBody {
    error: String,
}

#[async_trait]
impl ChatEngine for CloudEngine {
    async fn stream_completion(&self, history: &[ChatMessage]) -> Result<FragmentStream> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProxyRequest {
                messages: history,
                model: &self.model,
            })
            .send()
            .await
            .with_context(|| format!("Failed to reach chat proxy at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProxyErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    format!("API request failed with status {}", status.as_u16())
                });
            return Err(DeepSearchError::ApiError(message).into());
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = Utf8ChunkDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        let text = decoder.decode(&chunk);
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(anyhow::Error::from(e).context("Response stream interrupted"));
                        return;
                    }
                }
            }
            let tail = decoder.finish();
            if !tail.is_empty() {
                yield Ok(tail);
            }
        };

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
