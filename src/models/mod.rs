// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod client;
mod factory;
mod traits;
mod types;

// Public re-exports - the ONLY way to access model functionality
pub use client::{HttpCompletionClient, Transport};
pub use factory::ServiceFactory;
pub use traits::CompletionService;
#[cfg(test)]
pub use traits::MockCompletionService;
pub use types::{
    ChatMessage, CompletionRequest, ErrorBody, ErrorEnvelope, GenerationParams, MessageRole,
};
