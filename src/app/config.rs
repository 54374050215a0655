use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_API_KEY_ENV, DEFAULT_CATALOG_PATH, DEFAULT_MAX_HISTORY_TURNS, DEFAULT_MAX_TOKENS,
    DEFAULT_MODEL, DEFAULT_PROVIDER_URL, DEFAULT_RELAY_BIND, DEFAULT_RELAY_MAX_COMPLETION_TOKENS,
    DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, HTTP_REQUEST_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote completion service
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Product catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Saved selection storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Optional behaviour switches
    #[serde(default)]
    pub features: FeatureFlags,

    /// Relay server
    #[serde(default)]
    pub relay: RelayConfig,
}

/// How requests reach the completion provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Through the relay, which injects the credential server-side
    #[default]
    Relay,
    /// Straight to the provider with a bearer key. Development only.
    Direct,
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Transport to use
    pub mode: TransportMode,
    /// Relay URL (relay mode)
    pub endpoint: Option<String>,
    /// Provider URL (direct mode)
    pub provider_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable holding the API key (direct mode)
    pub api_key_env: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: usize,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Relay,
            endpoint: None,
            provider_url: DEFAULT_PROVIDER_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }
}

/// Conversation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum turns kept in history (two per exchange)
    pub max_turns: usize,
    /// System instruction
    pub system_prompt: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_HISTORY_TURNS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Path to products.json
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for saved state, defaults to the platform data dir
    pub dir: Option<PathBuf>,
}

/// Feature switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Save and restore the selection between runs
    pub persistence: bool,
    /// Enable keyword search over the catalog
    pub search: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            persistence: true,
            search: true,
        }
    }
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address to listen on
    pub bind: String,
    /// Upstream provider URL
    pub upstream_url: String,
    /// Environment variable holding the upstream key
    pub api_key_env: String,
    /// Model used when the client doesn't send one
    pub model: String,
    /// Temperature used when the client doesn't send one
    pub temperature: f32,
    /// Completion token limit used when the client doesn't send one
    pub max_completion_tokens: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_RELAY_BIND.to_string(),
            upstream_url: DEFAULT_PROVIDER_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_completion_tokens: DEFAULT_RELAY_MAX_COMPLETION_TOKENS,
        }
    }
}

/// Layer defaults, the given TOML files (later wins) and `ROUTINE_` env vars
fn build_figment(files: &[PathBuf]) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    // ROUTINE_COMPLETION__MODE=direct -> completion.mode
    figment.merge(Env::prefixed("ROUTINE_").split("__"))
}

/// Load configuration from multiple sources
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut files = vec![
        get_config_dir()?.join("config.toml"),
        PathBuf::from(".routine/config.toml"),
    ];

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        files.push(path.to_path_buf());
    }

    build_figment(&files)
        .extract()
        .context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "routine-builder") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("routine-builder");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Directory for saved selection state
pub fn get_data_dir(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.storage.dir {
        return Ok(dir.clone());
    }
    ProjectDirs::from("", "", "routine-builder")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .context("Could not determine data directory")
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
    }

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.completion.mode, TransportMode::Relay);
        assert_eq!(config.conversation.max_turns, 20);
        assert!(config.features.persistence);
        assert_eq!(config.relay.max_completion_tokens, 1500);
    }

    #[test]
    fn test_later_files_override_earlier() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let local = temp_dir.path().join("local.toml");
        fs::write(
            &global,
            "[completion]\nmode = \"direct\"\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();
        fs::write(&local, "[completion]\nmodel = \"gpt-4.1\"\n[features]\nsearch = false\n").unwrap();

        let config: Config = build_figment(&[global, local, temp_dir.path().join("missing.toml")])
            .extract()
            .unwrap();

        assert_eq!(config.completion.mode, TransportMode::Direct);
        assert_eq!(config.completion.model, "gpt-4.1");
        assert!(!config.features.search);
        assert!(config.features.persistence);
    }

    #[test]
    fn test_save_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let mut config = Config::default();
        config.completion.endpoint = Some("https://relay.example.workers.dev".into());

        save_config(&config, Some(path.clone())).unwrap();
        let loaded: Config = build_figment(&[path]).extract().unwrap();
        assert_eq!(
            loaded.completion.endpoint.as_deref(),
            Some("https://relay.example.workers.dev")
        );
    }
}
