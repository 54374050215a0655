use tracing::{debug, info};

use super::prompts::{routine_prompt, system_instruction};
use crate::catalog::CatalogItem;
use crate::models::{ChatMessage, CompletionRequest, CompletionService, GenerationParams};
use crate::utils::{Result, RoutineError};

/// Rolling user/assistant turns, bounded to `max_turns`
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: Vec<ChatMessage>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns,
        }
    }

    /// Record a completed exchange, then drop whole exchanges from the
    /// oldest end until the history fits
    pub fn push_exchange(&mut self, user: ChatMessage, assistant: ChatMessage) {
        self.turns.push(user);
        self.turns.push(assistant);

        let excess = self.turns.len().saturating_sub(self.max_turns);
        if excess > 0 {
            // Round up to a full exchange so history never starts mid-exchange
            let drop = (excess + 1) / 2 * 2;
            self.turns.drain(0..drop.min(self.turns.len()));
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Knobs for outbound requests
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub model: String,
    pub params: GenerationParams,
    pub system_prompt: String,
    pub max_turns: usize,
}

/// Owns the conversation history and talks to the completion service.
///
/// Sends take `&mut self`, so a single owner can never have two requests
/// racing on the same history.
pub struct ConversationManager {
    service: Box<dyn CompletionService>,
    history: ConversationHistory,
    settings: ConversationSettings,
}

impl ConversationManager {
    pub fn new(service: Box<dyn CompletionService>, settings: ConversationSettings) -> Self {
        Self {
            service,
            history: ConversationHistory::new(settings.max_turns),
            settings,
        }
    }

    /// System instruction, prior turns, then the new user turn
    pub fn build_request(&self, text: &str, selection: &[CatalogItem]) -> CompletionRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(system_instruction(
            &self.settings.system_prompt,
            selection,
        )));
        messages.extend_from_slice(self.history.turns());
        messages.push(ChatMessage::user(text));

        CompletionRequest::new(&self.settings.model, messages, &self.settings.params)
    }

    /// Send a user message and record the exchange on success
    pub async fn send_message(&mut self, text: &str, selection: &[CatalogItem]) -> Result<String> {
        let request = self.build_request(text, selection);
        self.exchange(request).await
    }

    /// Ask for a routine covering the whole selection
    pub async fn send_routine_request(&mut self, selection: &[CatalogItem]) -> Result<String> {
        if selection.is_empty() {
            return Err(RoutineError::EmptySelection);
        }
        info!("Requesting routine for {} products", selection.len());
        let request = self.build_request(&routine_prompt(selection), selection);
        self.exchange(request).await
    }

    /// Forget the conversation, e.g. after the selection changed
    pub fn invalidate(&mut self) {
        if !self.history.is_empty() {
            debug!("Clearing {} turns of history", self.history.len());
        }
        self.history.clear();
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    async fn exchange(&mut self, request: CompletionRequest) -> Result<String> {
        let user_turn = request
            .messages
            .last()
            .cloned()
            .ok_or_else(|| RoutineError::CompletionService("empty request".to_string()))?;

        // Nothing is recorded unless the service answered
        let reply = self.service.complete(&request).await?;

        self.history
            .push_exchange(user_turn, ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }
}
