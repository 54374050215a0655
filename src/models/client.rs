use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::traits::CompletionService;
use super::types::{ChatCompletionResponse, CompletionRequest, ErrorEnvelope};
use crate::utils::{Result, RoutineError};

/// Where requests go and whether we authenticate ourselves
#[derive(Debug, Clone)]
pub enum Transport {
    /// Relay injects the credential server-side
    Relay { endpoint: String },
    /// Provider called directly with a bearer key
    Direct { url: String, api_key: String },
}

impl Transport {
    fn url(&self) -> &str {
        match self {
            Transport::Relay { endpoint } => endpoint,
            Transport::Direct { url, .. } => url,
        }
    }
}

/// OpenAI-compatible chat-completion client.
/// The request and response shapes are identical for both transports.
pub struct HttpCompletionClient {
    client: Client,
    transport: Transport,
}

impl HttpCompletionClient {
    pub fn new(transport: Transport, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutineError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self { client, transport })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let url = self.transport.url();
        debug!("POST {} ({} messages)", url, request.messages.len());

        let mut builder = self.client.post(url).json(request);
        if let Transport::Direct { api_key, .. } = &self.transport {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| format!("{} ({})", envelope.error.message, envelope.error.kind))
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(RoutineError::CompletionService(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            RoutineError::CompletionService(format!("malformed response body: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                RoutineError::CompletionService("response contained no assistant message".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, GenerationParams};
    use httpmock::prelude::*;
    use serde_json::json;

    fn request() -> CompletionRequest {
        CompletionRequest::new(
            "gpt-4o",
            vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            &GenerationParams {
                temperature: 0.7,
                max_tokens: 100,
            },
        )
    }

    fn relay(server: &MockServer) -> HttpCompletionClient {
        HttpCompletionClient::new(
            Transport::Relay {
                endpoint: server.url("/"),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_relay_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/")
                    .json_body_partial(r#"{"model":"gpt-4o","messages":[{"role":"system","content":"sys"}]}"#);
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "Hi there!"}}]
                }));
            })
            .await;

        let reply = relay(&server).complete(&request()).await.unwrap();
        assert_eq!(reply, "Hi there!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_direct_mode_sends_bearer_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("Authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"content": "ok"}}]
                }));
            })
            .await;

        let client = HttpCompletionClient::new(
            Transport::Direct {
                url: server.url("/v1/chat/completions"),
                api_key: "sk-test".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(client.complete(&request()).await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status_is_completion_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(500).json_body(json!({
                    "error": {"message": "upstream exploded", "type": "api_error"}
                }));
            })
            .await;

        let err = relay(&server).complete(&request()).await.unwrap_err();
        match err {
            RoutineError::CompletionService(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("upstream exploded"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_completion_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let err = relay(&server).complete(&request()).await.unwrap_err();
        assert!(matches!(err, RoutineError::CompletionService(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_completion_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/");
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"choices": [{"message": {"content": "late"}}]}));
            })
            .await;

        let client = HttpCompletionClient::new(
            Transport::Relay {
                endpoint: server.url("/"),
            },
            Duration::from_millis(50),
        )
        .unwrap();

        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, RoutineError::CompletionService(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_completion_error() {
        let client = HttpCompletionClient::new(
            Transport::Relay {
                endpoint: "http://127.0.0.1:1/".into(),
            },
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(matches!(err, RoutineError::CompletionService(_)));
    }
}
