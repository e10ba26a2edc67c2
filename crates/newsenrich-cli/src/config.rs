//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use newsenrich_core::ExecutorKind;
use newsenrich_llm::ChatConfig;
use newsenrich_llm::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use newsenrich_pipeline::PipelineConfig;
use newsenrich_store::Columns;
use serde::Deserialize;

/// Global configuration for newsenrich
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub pipeline: PipelineSection,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub text_column: String,
    pub result_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let columns = Columns::default();
        Self {
            path: PathBuf::from("telegram_messages.csv"),
            text_column: columns.text,
            result_column: columns.result,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub batch_size: usize,
    pub save_interval: usize,
    pub concurrency: usize,
    pub pacing_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub min_text_length: usize,
    /// "async" or "thread"
    pub method: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let p = PipelineConfig::default();
        Self {
            batch_size: p.batch_size,
            save_interval: p.save_interval,
            concurrency: p.concurrency,
            pacing_ms: p.pacing_delay.as_millis() as u64,
            max_retries: p.max_retries,
            retry_delay_ms: p.retry_delay.as_millis() as u64,
            min_text_length: p.min_text_length,
            method: p.method.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./newsenrich.toml (current directory)
    /// 2. platform config dir, e.g. ~/.config/newsenrich/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("newsenrich.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Pipeline settings from the file, before CLI overrides.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let p = &self.pipeline;
        let method = ExecutorKind::from_name(&p.method)
            .with_context(|| format!("unknown method {:?} (expected \"async\" or \"thread\")", p.method))?;
        Ok(PipelineConfig {
            input: self.dataset.path.clone(),
            output: None,
            columns: Columns {
                text: self.dataset.text_column.clone(),
                result: self.dataset.result_column.clone(),
            },
            batch_size: p.batch_size,
            save_interval: p.save_interval,
            concurrency: p.concurrency,
            pacing_delay: Duration::from_millis(p.pacing_ms),
            max_retries: p.max_retries,
            retry_delay: Duration::from_millis(p.retry_delay_ms),
            min_text_length: p.min_text_length,
            method,
        })
    }

    /// Service settings; a zero timeout would expire every call immediately.
    pub fn chat_config(&self) -> Result<ChatConfig> {
        if self.llm.timeout_secs == 0 {
            bail!("[llm] timeout_secs must be at least 1");
        }
        Ok(ChatConfig {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            api_key: self.llm.api_key.clone(),
            timeout: Duration::from_secs(self.llm.timeout_secs),
        })
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "newsenrich").map(|d| d.config_dir().join("config.toml"))
}
