use thiserror::Error;

/// Main error type for the routine builder
#[derive(Error, Debug)]
pub enum RoutineError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Completion service error: {0}")]
    CompletionService(String),

    #[error("No products selected")]
    EmptySelection,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("A request is already in flight for this conversation")]
    Busy,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RoutineError {
    /// Text shown to the user in place of an assistant reply
    pub fn user_message(&self) -> String {
        match self {
            RoutineError::EmptySelection => {
                "Please select some products first before generating a routine!".to_string()
            }
            RoutineError::Configuration(_) => {
                "The assistant is not configured yet. Set a relay endpoint, or for local \
                 development export your API key and use direct mode."
                    .to_string()
            }
            RoutineError::CompletionService(_) => {
                "Sorry, I encountered an error. Please try again.".to_string()
            }
            RoutineError::Busy => {
                "Still working on your last message, hang tight.".to_string()
            }
            RoutineError::UnknownProduct(id) => format!("No product with id {} exists.", id),
            other => format!("Something went wrong: {}", other),
        }
    }
}

impl From<reqwest::Error> for RoutineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RoutineError::CompletionService("request timed out".to_string())
        } else {
            RoutineError::CompletionService(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            RoutineError::EmptySelection.user_message(),
            "Please select some products first before generating a routine!"
        );
        assert!(RoutineError::CompletionService("500".into())
            .user_message()
            .starts_with("Sorry"));
        assert!(RoutineError::UnknownProduct("42".into())
            .user_message()
            .contains("42"));
    }
}
