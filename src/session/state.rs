use std::sync::Arc;

use crate::models::{ChatMessage, LocalEngine, ModelDescriptor};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No engine prepared for the active model
    #[default]
    Idle,
    /// A local model is downloading or compiling
    EngineLoading,
    /// The active model can take submissions
    Ready,
    /// A completion is streaming into the transcript
    Submitting,
}

/// Everything a view needs to render a session. Published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub selected_model: &'static ModelDescriptor,
    pub phase: SessionPhase,
    pub is_submitting: bool,
    pub is_engine_loading: bool,
    pub is_switching_model: bool,
    pub load_progress: String,
    pub has_engine: bool,
}

impl SessionSnapshot {
    /// The message currently being streamed into, if a submission is running
    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        if self.is_submitting {
            self.messages.last()
        } else {
            None
        }
    }
}

/// Mutable session state, owned by the session behind a lock
pub(super) struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub selected_model: &'static ModelDescriptor,
    pub engine: Option<Arc<dyn LocalEngine>>,
    pub phase: SessionPhase,
    pub is_submitting: bool,
    pub is_engine_loading: bool,
    pub is_switching_model: bool,
    pub load_progress: String,
    /// Bumped on every model switch so late load results can be recognized
    pub load_generation: u64,
}

impl SessionState {
    pub fn new(messages: Vec<ChatMessage>, selected_model: &'static ModelDescriptor) -> Self {
        Self {
            messages,
            input: String::new(),
            selected_model,
            engine: None,
            phase: SessionPhase::Idle,
            is_submitting: false,
            is_engine_loading: false,
            is_switching_model: false,
            load_progress: String::new(),
            load_generation: 0,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.messages.clone(),
            input: self.input.clone(),
            selected_model: self.selected_model,
            phase: self.phase,
            is_submitting: self.is_submitting,
            is_engine_loading: self.is_engine_loading,
            is_switching_model: self.is_switching_model,
            load_progress: self.load_progress.clone(),
            has_engine: self.engine.is_some(),
        }
    }
}
