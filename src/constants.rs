/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_OLLAMA_HOST: &str = "localhost";
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

// Routes
pub const CHAT_ROUTE: &str = "/api/chat";
pub const MODELS_ROUTE: &str = "/api/models";
pub const HEALTH_ROUTE: &str = "/health";

// Timeouts
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const PROVIDER_REQUEST_TIMEOUT_SECS: u64 = 600; // 10 minutes for long generations
pub const OLLAMA_PULL_TIMEOUT_SECS: u64 = 3600; // model downloads can be large

// Chat defaults
pub const WELCOME_MESSAGE: &str =
    "Welcome to Deep Search\u{2014}your personal guide to the information that matters.";
pub const MODEL_LOAD_FAILED: &str = "Failed to load model";

// Config
pub const APP_NAME: &str = "deep-search";
pub const ENV_PREFIX: &str = "DEEP_SEARCH_";
pub const LOCAL_CONFIG_PATH: &str = ".deep-search/config.toml";
