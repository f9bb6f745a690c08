use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::auth::Credential;
use crate::error::{LocflowError, Result};

fn default_max_repair_retries() -> u32 {
    2
}

fn default_generation_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub connect: ConnectConfig,
    pub translate: TranslateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    /// Base URL of the remote catalog API
    pub base_url: String,
    /// Key identifier for the signing credential
    pub key_id: String,
    /// Issuer identifier for the signing credential
    pub issuer_id: String,
    /// Path to the PEM-encoded private key
    pub private_key_path: String,
    /// Timeout for each catalog API call, in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// AI provider family: anthropic, openai, or gemini
    pub provider: String,
    /// Model to use for generation
    pub model: String,
    /// API key; falls back to the provider's environment variable when unset
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the provider endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Extra generation attempts allowed when output exceeds the field limit
    #[serde(default = "default_max_repair_retries")]
    pub max_repair_retries: u32,
    /// Concurrent translation cap; 0 picks the available parallelism
    #[serde(default)]
    pub concurrency: usize,
    /// Timeout for each generation call, in seconds
    #[serde(default = "default_generation_timeout")]
    pub request_timeout_secs: u64,
    /// Extra instruction appended to every translation prompt
    #[serde(default)]
    pub refinement: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect: ConnectConfig {
                base_url: "https://api.appstoreconnect.apple.com".to_string(),
                key_id: String::new(),
                issuer_id: String::new(),
                private_key_path: String::new(),
                request_timeout_secs: 30,
            },
            translate: TranslateConfig {
                provider: "anthropic".to_string(),
                model: "claude-sonnet-4-20250514".to_string(),
                api_key: None,
                endpoint: None,
                max_repair_retries: default_max_repair_retries(),
                concurrency: 0,
                request_timeout_secs: default_generation_timeout(),
                refinement: None,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LocflowError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| LocflowError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LocflowError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| LocflowError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

impl ConnectConfig {
    /// Load the signing credential this configuration points at.
    pub fn credential(&self) -> Result<Credential> {
        if self.key_id.is_empty() || self.issuer_id.is_empty() {
            return Err(LocflowError::Config(
                "connect.key_id and connect.issuer_id must be set".to_string(),
            ));
        }
        Credential::from_pem_file(
            self.key_id.clone(),
            self.issuer_id.clone(),
            &self.private_key_path,
        )
    }
}

impl TranslateConfig {
    /// API key from the config file, falling back to the environment.
    pub fn resolve_api_key(&self, env_var: &str) -> Result<String> {
        if let Some(key) = self.api_key.as_deref() {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }
        std::env::var(env_var).map_err(|_| {
            LocflowError::Config(format!(
                "No API key for provider {}; set translate.api_key or {}",
                self.provider, env_var
            ))
        })
    }
}
