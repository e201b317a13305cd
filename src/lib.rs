pub mod app;
pub mod cli;
pub mod constants;
pub mod engine;
pub mod models;
pub mod provider;
pub mod runtime;
pub mod server;
pub mod session;
pub mod utils;

pub use app::{load_config, Config};
pub use engine::{Engine, OllamaLoader, ProxyClient};
pub use models::{ChatEngine, ChatMessage, MessageRole, ModelDescriptor};
pub use server::{build_router, serve, ServerState};
pub use session::{ChatSession, SessionPhase, SessionSnapshot, SubmitOutcome};
pub use utils::DeepSearchError;
