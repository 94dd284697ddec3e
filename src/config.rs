//! Runtime configuration for prompt-relay.
//!
//! Configuration is loaded from a JSON file and then overridden by command-line
//! flags. Every section has defaults, so an absent file or a partial file is fine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unknown provider '{0}' (expected 'ollama' or 'groq')")]
    UnknownProvider(String),
}

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "prompt-relay", about = "Streaming prompt relay for Ollama and Groq")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "relay.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides the config file).
    #[arg(long)]
    pub listen: Option<String>,

    /// Upstream provider: "ollama" or "groq" (overrides the config file).
    #[arg(long)]
    pub provider: Option<ProviderKind>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// Upstream provider configuration.
    pub provider: ProviderConfig,
}

/// How relay failures reach the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Every failure is written into the body as text; status is always 200.
    #[default]
    InBand,

    /// Failures before the first fragment become HTTP error statuses.
    Status,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8000").
    pub listen: String,

    /// Directory holding the landing page and other static assets.
    pub static_dir: PathBuf,

    /// Allow every origin, method and header.
    pub permissive_cors: bool,

    /// Error reporting policy for `/chat`.
    pub error_mode: ErrorMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            static_dir: PathBuf::from("static"),
            permissive_cors: true,
            error_mode: ErrorMode::InBand,
        }
    }
}

/// Which upstream generation service to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Groq,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "Ollama"),
            ProviderKind::Groq => write!(f, "Groq"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "groq" => Ok(ProviderKind::Groq),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// Upstream provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Active provider.
    pub kind: ProviderKind,

    /// Upstream connect and idle-read timeout in seconds (None = wait forever).
    pub request_timeout_secs: Option<u64>,

    /// Local Ollama settings.
    pub ollama: OllamaConfig,

    /// Hosted Groq settings.
    pub groq: GroqConfig,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Model name of the active provider.
    pub fn model(&self) -> &str {
        match self.kind {
            ProviderKind::Ollama => &self.ollama.model,
            ProviderKind::Groq => &self.groq.model,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Server root, without the `/api/generate` suffix.
    pub base_url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroqConfig {
    /// OpenAI-compatible API root.
    pub base_url: String,
    pub model: String,

    /// Sent as the `system` message ahead of the user's prompt.
    pub system_prompt: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            system_prompt: "You are a helpful assistant.".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply command-line overrides on top of file values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(kind) = cli.provider {
            self.provider.kind = kind;
        }
    }
}
