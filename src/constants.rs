/// Constants module to avoid magic numbers in the codebase

// Completion service
pub const DEFAULT_PROVIDER_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const PLACEHOLDER_API_KEY: &str = "your-openai-api-key-here";

// Timeouts
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 60;

// Default Model Configuration
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: usize = 1000;

// Conversation
pub const DEFAULT_MAX_HISTORY_TURNS: usize = 20; // 10 exchanges

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful beauty and skincare expert. \
Provide personalized routine advice based on the products users have selected. \
Be friendly, knowledgeable, and practical.";

// Persistence
pub const SELECTION_STORAGE_KEY: &str = "selectedProducts";

// Relay
pub const DEFAULT_RELAY_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_RELAY_MAX_COMPLETION_TOKENS: usize = 1500;
pub const RELAY_MAX_BODY_BYTES: usize = 1024 * 1024;

// Catalog
pub const DEFAULT_CATALOG_PATH: &str = "data/products.json";
