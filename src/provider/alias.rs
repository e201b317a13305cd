use once_cell::sync::Lazy;
use std::collections::HashMap;

/// UI model ids mapped to the provider's production ids
static MODEL_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("gemini-flash-lite-latest", "gemini-flash-lite-latest"),
        ("gemini-3-flash-preview", "gemini-3-flash-preview"),
        ("gemini-3-pro-preview", "gemini-3-pro-preview"),
        ("gemini-2.5-flash-lite", "gemini-2.5-flash-lite"),
        // stable pro alias
        ("gemini-2.5-pro", "gemini-pro-latest"),
    ])
});

/// Map a requested model id to the provider id.
///
/// Unknown ids are assumed canonical and pass through unchanged; the provider
/// rejects them if they are not.
pub fn resolve_model_id(model_id: &str) -> &str {
    MODEL_ALIASES.get(model_id).copied().unwrap_or(model_id)
}

/// All aliased ids
pub fn aliased_ids() -> impl Iterator<Item = &'static str> {
    MODEL_ALIASES.keys().copied()
}
