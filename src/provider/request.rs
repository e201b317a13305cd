use serde::Deserialize;

use super::alias::resolve_model_id;
use crate::models::{ChatMessage, MessageRole};
use crate::utils::DeepSearchError;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

/// Speaker labels the provider understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

impl From<MessageRole> for TurnRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Assistant => TurnRole::Model,
            // Everything that is not the model speaks as the user
            MessageRole::User | MessageRole::System => TurnRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTurn {
    pub role: TurnRole,
    pub text: String,
}

/// A chat request in the provider's shape: out-of-band system instruction,
/// prior turns as history, and the final turn as the current message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<ProviderTurn>,
    pub message: String,
}

impl ProviderRequest {
    /// Split a transcript into provider form.
    ///
    /// Consecutive turns with the same provider role are forwarded as-is.
    pub fn from_messages(model_id: &str, messages: &[ChatMessage]) -> Result<Self, DeepSearchError> {
        let Some(last) = messages.last() else {
            return Err(DeepSearchError::InvalidRequest(
                "messages must not be empty".to_string(),
            ));
        };
        if last.role == MessageRole::System {
            return Err(DeepSearchError::InvalidRequest(
                "last message must not be a system message".to_string(),
            ));
        }

        // Only the first system message is sent; later ones are dropped
        let system_instruction = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());

        let mut turns: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();
        // The last message is not a system message, so turns is non-empty
        let current = turns.pop().map(|m| m.content.clone()).unwrap_or_default();

        let history = turns
            .into_iter()
            .map(|m| ProviderTurn {
                role: m.role.into(),
                text: m.content.clone(),
            })
            .collect();

        Ok(Self {
            model: resolve_model_id(model_id).to_string(),
            system_instruction,
            history,
            message: current,
        })
    }
}
