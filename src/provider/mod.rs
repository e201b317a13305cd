// Gateway module for the cloud provider behind the proxy route

mod alias;
mod gemini;
mod request;
mod traits;

pub use alias::{aliased_ids, resolve_model_id};
pub use gemini::GeminiProvider;
pub use request::{ChatRequest, ProviderRequest, ProviderTurn, TurnRole};
pub use traits::ChatProvider;
