use async_trait::async_trait;
use std::time::Duration;

use super::client::{HttpCompletionClient, Transport};
use super::traits::CompletionService;
use super::types::CompletionRequest;
use crate::app::{CompletionConfig, TransportMode};
use crate::constants::PLACEHOLDER_API_KEY;
use crate::utils::{log_warn, Result, RoutineError};

/// Factory for completion services built from configuration
pub struct ServiceFactory;

impl ServiceFactory {
    /// Build the configured client. Fails with `Configuration` before any
    /// network traffic when the endpoint or key is missing.
    pub fn create(config: &CompletionConfig) -> Result<Box<dyn CompletionService>> {
        let transport = Self::transport(config, |name| std::env::var(name).ok())?;
        let client = HttpCompletionClient::new(transport, Duration::from_secs(config.timeout_secs))?;
        Ok(Box::new(client))
    }

    /// Like `create`, but a configuration problem yields a service that
    /// reports it on every call instead of failing startup
    pub fn create_or_unconfigured(config: &CompletionConfig) -> Box<dyn CompletionService> {
        match Self::create(config) {
            Ok(service) => service,
            Err(e) => {
                log_warn("🔌", format!("Assistant unavailable: {}", e));
                Box::new(Unconfigured {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Resolve the transport, reading secrets through `lookup`
    pub fn transport(
        config: &CompletionConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Transport> {
        match config.mode {
            TransportMode::Relay => {
                let endpoint = config
                    .endpoint
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .ok_or_else(|| {
                        RoutineError::Configuration(
                            "relay mode needs completion.endpoint (your relay URL)".to_string(),
                        )
                    })?;
                Ok(Transport::Relay {
                    endpoint: endpoint.to_string(),
                })
            }
            TransportMode::Direct => {
                let api_key = lookup(&config.api_key_env)
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty() && k != PLACEHOLDER_API_KEY)
                    .ok_or_else(|| {
                        RoutineError::Configuration(format!(
                            "direct mode needs an API key in ${}",
                            config.api_key_env
                        ))
                    })?;
                log_warn(
                    "⚠️",
                    "Direct mode sends your API key from this machine; use it for development only",
                );
                Ok(Transport::Direct {
                    url: config.provider_url.clone(),
                    api_key,
                })
            }
        }
    }
}

/// Stand-in used when no endpoint or key is configured
struct Unconfigured {
    reason: String,
}

#[async_trait]
impl CompletionService for Unconfigured {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(RoutineError::Configuration(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_requires_endpoint() {
        let config = CompletionConfig::default();
        let err = ServiceFactory::transport(&config, |_| None).unwrap_err();
        assert!(matches!(err, RoutineError::Configuration(_)));

        let config = CompletionConfig {
            endpoint: Some("https://relay.example.dev".into()),
            ..CompletionConfig::default()
        };
        let transport = ServiceFactory::transport(&config, |_| None).unwrap();
        assert!(matches!(transport, Transport::Relay { endpoint } if endpoint == "https://relay.example.dev"));
    }

    #[test]
    fn test_direct_rejects_missing_and_placeholder_keys() {
        let config = CompletionConfig {
            mode: TransportMode::Direct,
            ..CompletionConfig::default()
        };
        assert!(matches!(
            ServiceFactory::transport(&config, |_| None),
            Err(RoutineError::Configuration(_))
        ));
        assert!(matches!(
            ServiceFactory::transport(&config, |_| Some(PLACEHOLDER_API_KEY.to_string())),
            Err(RoutineError::Configuration(_))
        ));

        let transport = ServiceFactory::transport(&config, |name| {
            (name == "OPENAI_API_KEY").then(|| "sk-live".to_string())
        })
        .unwrap();
        assert!(matches!(transport, Transport::Direct { api_key, .. } if api_key == "sk-live"));
    }

    #[tokio::test]
    async fn test_unconfigured_service_reports_configuration_error() {
        let service = ServiceFactory::create_or_unconfigured(&CompletionConfig::default());
        let request = CompletionRequest::new(
            "gpt-4o",
            vec![],
            &crate::models::GenerationParams {
                temperature: 0.7,
                max_tokens: 10,
            },
        );
        let err = service.complete(&request).await.unwrap_err();
        assert!(matches!(err, RoutineError::Configuration(_)));
    }
}
