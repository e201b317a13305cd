use super::types::{ModelCategory, ModelDescriptor};

const fn cloud(
    id: &'static str,
    name: &'static str,
    description: Option<&'static str>,
) -> ModelDescriptor {
    ModelDescriptor {
        id,
        name,
        category: ModelCategory::Cloud,
        description,
    }
}

const fn local(id: &'static str, name: &'static str, description: &'static str) -> ModelDescriptor {
    ModelDescriptor {
        id,
        name,
        category: ModelCategory::Local,
        description: Some(description),
    }
}

/// Every model the chat session can select. The first entry is the default.
static AVAILABLE_MODELS: &[ModelDescriptor] = &[
    // Cloud models (provider API)
    cloud("gemini-flash-lite-latest", "Gemini Flash Lite (Cloud)", None),
    cloud(
        "gemini-3-flash-preview",
        "Gemini 3 Flash (Cloud)",
        Some("Speed-optimized model with agentic reasoning."),
    ),
    cloud(
        "gemini-3-pro-preview",
        "Gemini 3 Pro (Cloud)",
        Some("Flagship reasoning model for complex coding & 1M context."),
    ),
    cloud(
        "gemini-2.5-flash-lite",
        "Gemini 2.5 Flash Lite (Cloud)",
        Some("Ultra-low latency model for high-frequency tasks."),
    ),
    cloud(
        "gemini-2.5-pro",
        "Gemini 2.5 Pro (Cloud)",
        Some("Highly stable multimodal model with deep reasoning."),
    ),
    // Local models (Ollama tags)
    local(
        "deepseek-r1:8b",
        "DeepSeek R1 Distill Llama 8B (Local)",
        "Powerful reasoning model with 'Thinking' mode.",
    ),
    local(
        "llama4:scout",
        "Llama 4 Scout (Local)",
        "Meta's efficient mixture-of-experts model.",
    ),
    local(
        "llama3.1:8b",
        "Llama 3.1 8B (Local)",
        "Reliable general-purpose local model.",
    ),
    local(
        "gemma3:4b",
        "Gemma 3 4B (Local)",
        "Google's lightweight open model.",
    ),
    local(
        "phi4-mini",
        "Phi-4 Mini (Local)",
        "Microsoft's efficient reasoning engine.",
    ),
    local(
        "qwen3:8b",
        "Qwen 3 8B (Local)",
        "Excellent multilingual and coding support.",
    ),
    local(
        "smollm2:135m",
        "SmolLM2 135M (Local - Tiny)",
        "Fastest download; perfect for low-end devices or testing.",
    ),
];

/// All selectable models in display order
pub fn list() -> &'static [ModelDescriptor] {
    AVAILABLE_MODELS
}

/// Look up a model by id
pub fn find(id: &str) -> Option<&'static ModelDescriptor> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

/// The model a fresh session starts with
pub fn default_model() -> &'static ModelDescriptor {
    &AVAILABLE_MODELS[0]
}
