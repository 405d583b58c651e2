//! Configuration for Elicit sessions
//!
//! Settings are read from an optional TOML file and overridden by
//! `ELICIT__<SECTION>__<KEY>` environment variables.
//!
//! # Configuration File Format
//!
//! TOML format in `.elicit/config.toml`:
//!
//! ```toml
//! [session]
//! first_question_timeout_secs = 300
//! reply_timeout_secs = 300
//! operator_timeout_secs = 3600
//!
//! [engine]
//! min_questions = 3
//! max_questions = 10
//! max_iterations = 15
//!
//! [llm]
//! model = "claude-3-5-haiku-20241022"
//! max_tokens = 2048
//! temperature = 0.2
//! api_key_env = "ANTHROPIC_API_KEY"
//! ```

use crate::error::{ElicitError, Result};
use crate::services::llm::LlmConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment prefix for overrides, e.g. `ELICIT__SESSION__REPLY_TIMEOUT_SECS`
const ENV_PREFIX: &str = "ELICIT";
const ENV_SEPARATOR: &str = "__";

/// Complete Elicit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElicitConfig {
    /// Bounds on the blocking waits of a session
    #[serde(default)]
    pub session: SessionSettings,

    /// Limits for the LLM-backed reasoning engine
    #[serde(default)]
    pub engine: EngineSettings,

    /// Model connection settings
    #[serde(default)]
    pub llm: LlmSettings,
}

/// Wait bounds for the coordinator and the engine-side clarifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How long the first turn waits for the engine's first question
    #[serde(default = "default_engine_wait")]
    pub first_question_timeout_secs: u64,

    /// How long a later turn waits for the next question or final result
    #[serde(default = "default_engine_wait")]
    pub reply_timeout_secs: u64,

    /// How long the engine waits for the operator to answer a question
    #[serde(default = "default_operator_wait")]
    pub operator_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            first_question_timeout_secs: default_engine_wait(),
            reply_timeout_secs: default_engine_wait(),
            operator_timeout_secs: default_operator_wait(),
        }
    }
}

impl SessionSettings {
    pub fn first_question_timeout(&self) -> Duration {
        Duration::from_secs(self.first_question_timeout_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn operator_timeout(&self) -> Duration {
        Duration::from_secs(self.operator_timeout_secs)
    }
}

/// Question budget for the LLM engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Questions the engine must ask before it may conclude
    #[serde(default = "default_min_questions")]
    pub min_questions: usize,

    /// Questions after which the engine must conclude
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,

    /// Hard cap on model calls per session
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            min_questions: default_min_questions(),
            max_questions: default_max_questions(),
            max_iterations: default_max_iterations(),
        }
    }
}

/// Model connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
        }
    }
}

// Default value helpers
fn default_engine_wait() -> u64 {
    300
}

fn default_operator_wait() -> u64 {
    3600
}

fn default_min_questions() -> usize {
    3
}

fn default_max_questions() -> usize {
    10
}

fn default_max_iterations() -> usize {
    15
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_max_tokens() -> usize {
    2048
}

fn default_temperature() -> f32 {
    0.2
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

impl ElicitConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Config file not found, using defaults: {:?}", path);
        }

        let config: ElicitConfig = config::Config::builder()
            .add_source(
                config::File::from(path.to_path_buf())
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ElicitError::Other(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ElicitError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create config directory: {}", e),
                    ))
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| {
            ElicitError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config file: {}", e),
            ))
        })?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match env::var(&self.llm.api_key_env) {
            Ok(key) if !key.trim().is_empty() => {
                debug!("Using API key from {}", self.llm.api_key_env);
                Ok(key)
            }
            _ => Err(ElicitError::Config(config::ConfigError::Message(format!(
                "API key not found. Set the {} environment variable",
                self.llm.api_key_env
            )))),
        }
    }

    /// Build the LLM client configuration, resolving the API key
    pub fn to_llm_config(&self) -> Result<LlmConfig> {
        Ok(LlmConfig {
            api_key: self.api_key()?,
            model: self.llm.model.clone(),
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        })
    }

    /// Default config path for a project
    pub fn default_path() -> PathBuf {
        PathBuf::from(".elicit/config.toml")
    }
}
