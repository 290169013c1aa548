//! Configuration management for refact
//!
//! Settings come from three layers, later layers winning:
//! built-in defaults, an optional TOML file, then environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{RefactError, Result};

/// Upstream LLM provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = RefactError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            _ => Err(RefactError::Config(format!(
                "Unsupported LLM provider: {}",
                s
            ))),
        }
    }
}

/// Hosted database used to persist chat sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Base URL of the PostgREST endpoint (e.g. a Supabase project URL)
    pub url: String,
    /// Anonymous API key
    pub anon_key: String,
}

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub provider: Provider,

    /// Upstream API key; requests fail upstream when unset
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model short name (opus, sonnet, haiku)
    #[serde(default = "default_model")]
    pub model: String,

    /// Token ceiling for agent calls
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_anthropic_url")]
    pub anthropic_url: String,

    #[serde(default = "default_github_url")]
    pub github_url: String,

    /// Session persistence; in-memory when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "sonnet".to_string()
}

fn default_max_tokens() -> usize {
    4000
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            provider: Provider::default(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            anthropic_url: default_anthropic_url(),
            github_url: default_github_url(),
            database: None,
        }
    }
}

impl ServerConfig {
    /// Load from an optional TOML file, then apply process environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            RefactError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }

        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.provider = provider.parse()?;
        }

        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| RefactError::Config(format!("Invalid PORT: {}", port)))?;
        }

        if let Some(model) = lookup("REFACT_MODEL") {
            self.model = model;
        }

        if let Some(max_tokens) = lookup("REFACT_MAX_TOKENS") {
            self.max_tokens = max_tokens.parse().map_err(|_| {
                RefactError::Config(format!("Invalid REFACT_MAX_TOKENS: {}", max_tokens))
            })?;
        }

        match (lookup("SUPABASE_URL"), lookup("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => {
                self.database = Some(DatabaseConfig { url, anon_key });
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "Only one of SUPABASE_URL / SUPABASE_ANON_KEY is set; ignoring database settings"
                );
            }
            (None, None) => {}
        }

        Ok(self)
    }

    /// Enabled optional features, reported by the health endpoint
    pub fn features(&self) -> Vec<&'static str> {
        let mut features = vec!["chat", "projects", "agent"];
        if self.database.is_some() {
            features.push("persistence");
        }
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.max_tokens, 4000);
        assert!(config.api_key.is_none());
        assert!(config.database.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::default()
            .with_env(env(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("PORT", "8080"),
                ("SUPABASE_URL", "https://db.example.com"),
                ("SUPABASE_ANON_KEY", "anon"),
            ]))
            .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.database,
            Some(DatabaseConfig {
                url: "https://db.example.com".to_string(),
                anon_key: "anon".to_string(),
            })
        );
        assert!(config.features().contains(&"persistence"));
    }

    #[test]
    fn test_half_database_config_ignored() {
        let config = ServerConfig::default()
            .with_env(env(&[("SUPABASE_URL", "https://db.example.com")]))
            .unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let result = ServerConfig::default().with_env(env(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(RefactError::Config(_))));
    }

    #[test]
    fn test_unsupported_provider() {
        let result = ServerConfig::default().with_env(env(&[("LLM_PROVIDER", "openai")]));
        assert!(matches!(result, Err(RefactError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000\nmodel = \"haiku\"\n\n[database]\nurl = \"https://db\"\nanon_key = \"k\"").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.model, "haiku");
        assert_eq!(config.max_tokens, 4000);
        assert!(config.database.is_some());
    }

    #[test]
    fn test_from_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"nope\"").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(RefactError::Config(_))
        ));
    }
}
