//! Application configuration.
//!
//! Values come from an optional TOML file. The binary applies CLI flags and
//! environment variables on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MaculaError, MaculaResult};
use crate::intake::model::{ImageFormat, IntakeLimits, DEFAULT_MAX_IMAGE_BYTES};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "macula.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub intake: IntakeConfig,
    pub classifier: ClassifierConfig,
    pub heatmap: HeatmapConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on request bodies, before image validation.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            body_limit_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    pub max_image_bytes: usize,
    pub allowed_types: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allowed_types: vec!["image/jpeg".to_string(), "image/png".to_string()],
        }
    }
}

impl IntakeConfig {
    pub fn to_limits(&self) -> MaculaResult<IntakeLimits> {
        if self.max_image_bytes == 0 {
            return Err(MaculaError::startup("intake.max_image_bytes must be positive"));
        }

        let mut allowed = Vec::new();
        for mime in &self.allowed_types {
            let format = ImageFormat::from_mime(mime).ok_or_else(|| {
                MaculaError::startup(format!("intake.allowed_types: unsupported type '{}'", mime))
            })?;
            if !allowed.contains(&format) {
                allowed.push(format);
            }
        }
        if allowed.is_empty() {
            return Err(MaculaError::startup("intake.allowed_types must not be empty"));
        }

        Ok(IntakeLimits {
            max_bytes: self.max_image_bytes,
            allowed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Cloud project. Falls back to the credentials' project id.
    pub project: Option<String>,
    pub location: String,
    pub endpoint_id: Option<String>,
    /// Full `:predict` URL. Overrides project, location and endpoint id.
    pub endpoint_url: Option<String>,
    /// Replaces `https://{location}-aiplatform.googleapis.com`.
    pub api_base: Option<String>,
    pub confidence_threshold: f64,
    pub max_predictions: u32,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            project: None,
            location: "us-central1".to_string(),
            endpoint_id: None,
            endpoint_url: None,
            api_base: None,
            confidence_threshold: 0.5,
            max_predictions: 5,
            timeout_secs: 60,
        }
    }
}

impl ClassifierConfig {
    /// Resolve the `:predict` URL.
    pub fn predict_url(&self, fallback_project: Option<&str>) -> MaculaResult<String> {
        if let Some(url) = self.endpoint_url.as_deref().filter(|u| !u.trim().is_empty()) {
            return Ok(url.trim().to_string());
        }

        let project = self
            .project
            .as_deref()
            .or(fallback_project)
            .ok_or_else(|| MaculaError::startup("classifier.project is not set and the credentials carry no project id"))?;
        let endpoint_id = self
            .endpoint_id
            .as_deref()
            .ok_or_else(|| MaculaError::startup("classifier.endpoint_id is not set"))?;

        let base = match self.api_base.as_deref() {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        };

        Ok(format!(
            "{}/v1/projects/{}/locations/{}/endpoints/{}:predict",
            base, project, self.location, endpoint_id
        ))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatmapMode {
    #[default]
    Overlay,
    Process,
    None,
}

impl HeatmapMode {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "overlay" => Some(Self::Overlay),
            "process" => Some(Self::Process),
            "none" | "off" => Some(Self::None),
            _ => None,
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overlay => "overlay",
            Self::Process => "process",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub mode: HeatmapMode,
    /// Program run in `process` mode.
    pub command: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Require a session token on the analysis endpoints.
    pub required: bool,
}

impl AppConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> MaculaResult<Self> {
        toml::from_str(content).map_err(|e| MaculaError::startup(format!("invalid config: {}", e)))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `macula.toml` in the working
    /// directory is used when present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> MaculaResult<Self> {
        let path: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path).map_err(|e| {
            MaculaError::startup(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }
}
