//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Which entity detection backend to run. Chosen once at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorBackend {
    /// Regex/dictionary patterns, no external dependency.
    Heuristic,
    /// Typed classifiers over tokenized text.
    Statistical,
    /// LLM-prompted extraction via a local generate API.
    Prompted,
    /// Remote analyzer service.
    Analyzer,
}

impl std::str::FromStr for DetectorBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" => Ok(Self::Heuristic),
            "statistical" => Ok(Self::Statistical),
            "prompted" => Ok(Self::Prompted),
            "analyzer" => Ok(Self::Analyzer),
            other => Err(Error::Config(format!("unknown detector backend: {}", other))),
        }
    }
}

impl std::fmt::Display for DetectorBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::Statistical => write!(f, "statistical"),
            Self::Prompted => write!(f, "prompted"),
            Self::Analyzer => write!(f, "analyzer"),
        }
    }
}

/// What to do when the detection backend fails.
///
/// One explicit switch for all backends rather than per-backend behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Propagate the failure to the caller.
    Abort,
    /// Return the original text unmodified with no mapping.
    Passthrough,
}

impl std::str::FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "passthrough" => Ok(Self::Passthrough),
            other => Err(Error::Config(format!("unknown failure policy: {}", other))),
        }
    }
}

/// Paths to Veil data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Mapping database directory (`data/mappings/`).
    pub mappings: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            mappings: root.join("mappings"),
            root,
        };
        std::fs::create_dir_all(&paths.mappings)?;
        Ok(paths)
    }
}

/// Settings for the prompted-extractor LLM backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of an Ollama-compatible generate API.
    pub base_url: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "llama3.1".into(),
        }
    }
}

/// Top-level Veil configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VeilConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Active detection backend.
    pub detector: DetectorBackend,
    /// Minimum confidence for a span to produce a placeholder.
    pub min_score: f64,
    /// Maximum stored length of an original value, in chars.
    pub max_value_len: usize,
    /// Behavior when the detection backend fails.
    pub failure_policy: FailurePolicy,
    /// Base URL of the remote analyzer service (analyzer backend only).
    pub analyzer_url: Option<String>,
    /// LLM settings (prompted backend only).
    pub llm: LlmSettings,
}

impl VeilConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3010);

        let data_paths = DataPaths::new(data_dir)?;

        let detector = match std::env::var("VEIL_DETECTOR") {
            Ok(v) => v.parse()?,
            Err(_) => DetectorBackend::Heuristic,
        };

        let min_score = std::env::var("VEIL_MIN_SCORE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.70);

        let max_value_len = std::env::var("VEIL_MAX_VALUE_LEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024);

        let failure_policy = match std::env::var("VEIL_ON_DETECTOR_ERROR") {
            Ok(v) => v.parse()?,
            Err(_) => FailurePolicy::Abort,
        };

        let analyzer_url = std::env::var("VEIL_ANALYZER_URL").ok();

        let mut llm = LlmSettings::default();
        if let Ok(url) = std::env::var("VEIL_LLM_URL") {
            llm.base_url = url;
        }
        if let Ok(model) = std::env::var("VEIL_LLM_MODEL") {
            llm.model = model;
        }

        Ok(Self {
            port,
            data_paths,
            detector,
            min_score,
            max_value_len,
            failure_policy,
            analyzer_url,
            llm,
        })
    }
}
