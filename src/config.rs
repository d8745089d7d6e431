use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::eval::DEFAULT_TOP_K;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub receval: RecevalConfig,
    #[serde(default)]
    pub eval: EvalConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecevalConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RecevalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Evaluation pass settings
#[derive(Debug, Clone, Deserialize)]
pub struct EvalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Drop items the user has already seen before ranking.
    #[serde(default)]
    pub exclude_seen: bool,
    /// Pass thresholds for the eval CLI exit code.
    #[serde(default)]
    pub min_recall: Option<f64>,
    #[serde(default)]
    pub min_ndcg: Option<f64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            exclude_seen: false,
            min_recall: None,
            min_ndcg: None,
        }
    }
}

/// Input locations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataConfig {
    /// JSON evaluation dataset. May instead come from the command line.
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    /// Raw little-endian f32 embedding file, used when the dataset has no
    /// inline embeddings.
    #[serde(default)]
    pub embeddings: Option<PathBuf>,
    #[serde(default)]
    pub embedding_dim: Option<usize>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in RECEVAL_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("RECEVAL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::load_from(&config_path)
    }

    /// Load and validate a specific config file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.data.embeddings.is_some() && self.data.embedding_dim.unwrap_or(0) == 0 {
            anyhow::bail!(
                "data.embedding_dim must be set and greater than 0 when data.embeddings is set"
            );
        }

        for (name, value) in [
            ("eval.min_recall", self.eval.min_recall),
            ("eval.min_ndcg", self.eval.min_ndcg),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    anyhow::bail!("{} must be between 0.0 and 1.0", name);
                }
            }
        }

        Ok(())
    }

    /// Dataset to load: `cli` when given, else `data.dataset`. The chosen file must exist.
    pub fn resolve_dataset(&self, cli: Option<&Path>) -> Result<PathBuf> {
        let (path, source) = match (cli, &self.data.dataset) {
            (Some(path), _) => (path, "--dataset"),
            (None, Some(path)) => (path.as_path(), "data.dataset"),
            (None, None) => {
                anyhow::bail!("No dataset configured: set data.dataset or pass --dataset");
            }
        };
        if !path.exists() {
            anyhow::bail!("{} path does not exist: {}", source, path.display());
        }
        Ok(path.to_path_buf())
    }

    /// Top-K cutoff: `cli` when given, else `eval.top_k`.
    ///
    /// Zero is accepted and only warned about, so call this after the logger is up.
    pub fn top_k(&self, cli: Option<usize>) -> usize {
        let top_k = cli.unwrap_or(self.eval.top_k);
        if top_k == 0 {
            log::warn!("top_k is 0; all metrics and recommendation lists will be empty");
        }
        top_k
    }

    pub fn log_level(&self) -> &str {
        &self.receval.log_level
    }

    /// Logger builder honouring `RUST_LOG`, falling back to `receval.log_level`.
    pub fn log_builder(&self) -> env_logger::Builder {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level()),
        )
    }
}
