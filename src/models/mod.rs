// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod registry;
mod traits;
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use registry::{default_model, find as find_model, list as list_models};
pub use traits::{ChatEngine, CloudConnector, LocalEngine, LocalEngineLoader};
pub use types::{
    ChatMessage, FragmentStream, MessageRole, ModelCategory, ModelDescriptor, ProgressCallback,
};
