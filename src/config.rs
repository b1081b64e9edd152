use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{Backend, FfmpegBackend, ResolveBackend, ToolCommand};

const CONFIG_FILE: &str = "cutflow.json";

/// Which media backend executes plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Ffmpeg,
    Resolve,
}

/// ffmpeg backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(flatten)]
    pub tool: ToolCommand,
    /// Per-step time limit
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            tool: ToolCommand::ffmpeg(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendKind,
    /// Where step artifacts and the run report are written
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("outputs")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            out_dir: default_out_dir(),
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl Config {
    /// Load from `explicit` if given, else the first existing default
    /// location, else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from(path);
        }
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .context(format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .context(format!("Invalid config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `./cutflow.json`, then the per-user config directory
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("cutflow").join("config.json"));
        }
        paths
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.ffmpeg.timeout_secs == 0 {
            bail!("ffmpeg.timeout_secs must be greater than zero");
        }
        if self.ffmpeg.tool.command.trim().is_empty() {
            bail!("ffmpeg.command must not be empty");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ffmpeg.timeout_secs)
    }

    /// Instantiate the configured backend
    pub fn build_backend(&self) -> Box<dyn Backend> {
        match self.backend {
            BackendKind::Ffmpeg => Box::new(FfmpegBackend::new(self.ffmpeg.tool.clone(), self.timeout())),
            BackendKind::Resolve => Box::new(ResolveBackend),
        }
    }
}
