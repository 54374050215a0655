/// Conversation module - Gateway

mod conversation;
mod prompts;

pub use conversation::{ConversationHistory, ConversationManager, ConversationSettings};
pub use prompts::{routine_prompt, system_instruction};
