//! Configuration loading
//!
//! Configuration is read from TOML with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `./welltrack.toml`
//! 3. Built-in defaults
//!
//! `WELLTRACK_MODEL_DIR` overrides the model directory. The API key is never
//! stored in the file; it is read from the environment variable named by
//! `llm.api_key_env`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::InsightError;
use crate::synthesis::{RetryConfig, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "welltrack.toml";
/// Environment variable overriding `models.dir`
pub const MODEL_DIR_ENV: &str = "WELLTRACK_MODEL_DIR";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Location of the classifier artifacts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsConfig {
    /// Directory holding `habit_model.json`, `mood_model.json` and `sleep_model.json`
    #[serde(default = "default_model_dir")]
    pub dir: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: default_model_dir(),
        }
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Text-generation backend settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            retry: RetrySection::default(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

/// `[llm.retry]`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5000
}

impl Config {
    /// Load configuration and apply environment overrides.
    ///
    /// Returns the config together with the file it came from, if any.
    pub fn load(explicit_path: Option<&Path>) -> Result<(Self, Option<PathBuf>), InsightError> {
        let path = Self::resolve_config_path(explicit_path)?;
        let mut config = match &path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok((config, path))
    }

    /// Parse a config file without applying overrides
    pub fn from_file(path: &Path) -> Result<Self, InsightError> {
        let content = fs::read_to_string(path).map_err(|e| {
            InsightError::Config(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            InsightError::Config(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>, InsightError> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(InsightError::Config(format!(
                "Config file not found: {path:?}"
            )));
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Ok(Some(local));
        }
        Ok(None)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(MODEL_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            self.models.dir = PathBuf::from(dir);
        }
    }

    pub fn validate(&self) -> Result<(), InsightError> {
        if self.llm.timeout_secs == 0 {
            return Err(InsightError::Config(
                "llm.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.llm.retry.max_attempts == 0 {
            return Err(InsightError::Config(
                "llm.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(InsightError::Config("llm.api_key_env is empty".to_string()));
        }
        Ok(())
    }

    /// API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        let retry = &self.llm.retry;
        RetryConfig::new()
            .max_attempts(retry.max_attempts)
            .initial_delay(Duration::from_millis(retry.initial_delay_ms))
            .max_delay(Duration::from_millis(retry.max_delay_ms))
    }

    /// Build the hosted text generator described by `[llm]`
    #[cfg(feature = "groq")]
    pub fn groq_client(
        &self,
    ) -> Result<crate::synthesis::GroqClient, crate::error::SynthesisError> {
        let api_key = self.api_key().ok_or_else(|| {
            crate::error::SynthesisError::MissingApiKey(self.llm.api_key_env.clone())
        })?;
        crate::synthesis::GroqClient::new(
            api_key,
            self.llm.model.clone(),
            self.llm.base_url.clone(),
            self.timeout(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.models.dir, PathBuf::from("models"));
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.timeout(), Duration::from_secs(20));

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 2);
        assert_eq!(retry.initial_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_partial_file() {
        let toml = r#"
            [models]
            dir = "/srv/welltrack/models"

            [llm]
            timeout_secs = 5

            [llm.retry]
            max_attempts = 3
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.models.dir, PathBuf::from("/srv/welltrack/models"));
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.llm.retry.max_attempts, 3);
        assert_eq!(config.llm.retry.initial_delay_ms, 500);
        assert_eq!(config.llm.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let toml = r#"
            [llm]
            temprature = 0.9
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "[llm]\nmodel = \"llama-3.3-70b-versatile\"\n").unwrap();

        let (config, source) = Config::load(Some(&path)).unwrap();
        assert_eq!(config.llm.model, "llama-3.3-70b-versatile");
        assert_eq!(source, Some(path));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, InsightError::Config(_)));
    }

    #[test]
    fn test_model_dir_override() {
        let mut config = Config::default();
        config.apply_env_overrides(|name| {
            (name == MODEL_DIR_ENV).then(|| "/opt/models".to_string())
        });
        assert_eq!(config.models.dir, PathBuf::from("/opt/models"));

        let mut config = Config::default();
        config.apply_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.models.dir, PathBuf::from("models"));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.llm.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.llm.timeout_secs = 0;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_api_key_reads_configured_variable() {
        let mut config = Config::default();
        config.llm.api_key_env = "WELLTRACK_TEST_KEY_THAT_IS_NOT_SET".to_string();
        assert_eq!(config.api_key(), None);
    }
}
