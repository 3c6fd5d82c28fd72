//! Configuration handling
//!
//! Settings live in `config.toml` inside the data directory. A default
//! file is written on `eduagent init`; missing keys fall back to the
//! built-in defaults so older config files keep working.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Resolve the eduagent data directory.
///
/// `EDUAGENT_DATA_DIR` wins if set; then a `.eduagent` directory in the
/// current project; otherwise `~/.eduagent`.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("EDUAGENT_DATA_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let cwd = std::env::current_dir()?;
    let project_dir = cwd.join(".eduagent");
    if project_dir.exists() {
        return Ok(project_dir);
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".eduagent"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub generator: GeneratorConfig,
}

/// Cadence and backoff policy for the agent runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Seconds between orchestrator ticks
    pub tick_interval_secs: u64,
    /// Consecutive errored ticks before pausing
    pub max_errors_before_pause: u32,
    /// Seconds to pause once the error ceiling is hit
    pub error_pause_secs: u64,
    /// Seconds allowed for an in-flight tick to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 30,
            max_errors_before_pause: 5,
            error_pause_secs: 60,
            shutdown_grace_secs: 5,
        }
    }
}

/// Content-generator backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// OpenAI-compatible chat completions endpoint
    pub base_url: String,
    pub model: String,
    /// API key; the EDUAGENT_API_KEY env var overrides this
    pub api_key: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: String::new(),
            timeout_secs: 45,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runner: RunnerConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory, falling back to defaults
    /// if no file exists yet.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("config.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the default config file if one does not exist.
    pub fn write_default(dir: &Path) -> Result<()> {
        let path = dir.join("config.toml");
        if path.exists() {
            return Ok(());
        }
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Resolve the generator API key, preferring the environment.
    pub fn api_key(&self) -> Option<String> {
        std::env::var("EDUAGENT_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                if self.generator.api_key.is_empty() {
                    None
                } else {
                    Some(self.generator.api_key.clone())
                }
            })
    }
}
