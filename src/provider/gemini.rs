use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::request::{ProviderRequest, TurnRole};
use super::traits::ChatProvider;
use crate::app::ProviderConfig;
use crate::constants::HTTP_CONNECT_TIMEOUT_SECS;
use crate::models::FragmentStream;
use crate::utils::DeepSearchError;

/// Google Generative Language API client (`streamGenerateContent`)
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl StreamChunk {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, DeepSearchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_body(request: &ProviderRequest) -> GenerateContentRequest {
        let text_content = |role: Option<&str>, text: &str| Content {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        };

        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| text_content(Some(turn.role.as_str()), &turn.text))
            .collect();
        contents.push(text_content(Some(TurnRole::User.as_str()), &request.message));

        GenerateContentRequest {
            system_instruction: request
                .system_instruction
                .as_deref()
                .map(|s| text_content(None, s)),
            contents,
        }
    }
}

/// Pull a readable message out of a provider error body
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| e.error.message)
}

/// Turn one SSE event's data into a fragment. `Ok(None)` for chunks without text.
fn parse_payload(payload: &str) -> anyhow::Result<Option<String>> {
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| anyhow::anyhow!("Malformed provider chunk: {}", e))?;
    if let Some(error) = chunk.error {
        anyhow::bail!("Provider error: {}", error.message);
    }
    let text = chunk.text();
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn stream_chat(
        &self,
        api_key: &str,
        request: ProviderRequest,
    ) -> Result<FragmentStream, DeepSearchError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        debug!(model = %request.model, turns = request.history.len() + 1, "opening provider stream");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_body(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| format!("request failed with status {}", status));
            return Err(DeepSearchError::ProviderError(message));
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("provider stream interrupted: {}", e);
                        yield Err(anyhow::Error::from(e));
                        return;
                    }
                };

                match parse_payload(&event.data) {
                    Ok(Some(text)) => yield Ok(text),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
