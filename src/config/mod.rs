use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dates::WeekStart;
use crate::domain::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api: Option<ApiConfig>,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_weekly_cron")]
    pub weekly_cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    #[serde(default)]
    pub week_start: WeekStart,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            weekly_cron: default_weekly_cron(),
            timezone: default_timezone(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            week_start: WeekStart::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

fn default_pool_size() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_weekly_cron() -> String {
    "0 2 * * 1".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    1_000
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_llm_max_retries() -> u32 {
    3
}

impl Config {
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| crate::domain::FinanceOpsError::Config(e.to_string()))?;
        Ok(config)
    }

    pub fn default_sqlite() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:finance-ops.db".to_string(),
                pool_size: 10,
            },
            api: None,
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            scheduler: SchedulerConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}
