//! Configuration types for the dialogue core.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration, persisted as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistConfig {
    /// Completion backend settings.
    pub gateway: GatewayConfig,
    /// Dialogue controller settings.
    pub dialogue: DialogueConfig,
    /// Narration playback settings.
    pub narration: NarrationConfig,
}

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL for the chat-completions API server.
    pub api_url: String,
    /// Model name to request from the API.
    pub api_model: String,
    /// API key for the remote provider. Empty means unconfigured; any send
    /// attempt then fails with `BackendUnavailable`.
    pub api_key: String,
    /// Request timeout in seconds. Generous, reflecting slow backend
    /// generation on long contexts.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_owned(),
            api_model: "gpt-4-turbo".to_owned(),
            api_key: String::new(),
            timeout_secs: 110,
        }
    }
}

/// Dialogue controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueConfig {
    /// System prompt installed as the first message of every session.
    pub system_prompt: String,
    /// Whether accumulated fragments are flushed automatically after the
    /// quiet period. When false, a flush only occurs on the send phrase.
    pub auto_send: bool,
    /// Quiet period in seconds after the last final fragment before an
    /// automatic flush fires.
    pub quiet_period_secs: u64,
    /// Literal phrase that triggers a manual flush when auto-send is off.
    pub send_phrase: String,
    /// Word-count threshold for committing the recording buffer as one
    /// user message in record mode.
    pub record_chunk_words: usize,
    /// Estimated-token budget for the conversation history.
    pub context_token_budget: usize,
    /// Maximum output tokens to request per completion.
    pub max_reply_tokens: u32,
    /// Fixed descriptive prompt sent alongside a captured image.
    pub image_prompt: String,
    /// Bounded wait in seconds for the image payload after a question
    /// command triggers capture. On expiry the session emits an error and
    /// returns to inactive.
    pub capture_timeout_secs: u64,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant speaking through \
                            a pair of smart glasses. Keep replies short."
                .to_owned(),
            auto_send: true,
            quiet_period_secs: 7,
            send_phrase: "send message".to_owned(),
            record_chunk_words: 100,
            context_token_budget: 4096,
            max_reply_tokens: 4096,
            image_prompt: "Describe this image in simple terms for visually impaired users."
                .to_owned(),
            capture_timeout_secs: 30,
        }
    }
}

/// Narration playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Number of words per displayed group.
    pub group_words: usize,
    /// How long each group is held on the display, in milliseconds.
    pub group_display_ms: u64,
    /// Role label prefixed to the first group of a narration sequence.
    pub assistant_label: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            group_words: 23,
            group_display_ms: 3000,
            assistant_label: "assistant:".to_owned(),
        }
    }
}

impl AssistConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::DialogueError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::DialogueError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/glasschat/config.toml`.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("glasschat").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("glasschat")
                .join("config.toml")
        } else {
            PathBuf::from("glasschat-config.toml")
        }
    }
}
