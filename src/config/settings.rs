//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Variables injected by the image-build pipeline, mapped onto settings keys.
const LEGACY_ENV_OVERRIDES: [(&str, &str); 4] = [
    ("PROXY_PORT", "server.port"),
    ("KFSERVING_PORT", "upstream.port"),
    ("MODEL_NAME", "upstream.model_name"),
    ("IMAGE_TYPE", "inference.color_mode"),
];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub inference: InferenceConfig,
    pub shutdown: ShutdownConfig,
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// The model server, always reached over loopback
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_port")]
    pub port: u16,
    #[serde(default)]
    pub model_name: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_upstream_port() -> u16 {
    8081
}

fn default_timeout() -> u64 {
    60000
}

fn default_max_request_bytes() -> usize {
    100 * 1024 * 1024
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// How images are turned into tensors
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// One luminance value per pixel
    #[default]
    #[serde(alias = "gray", alias = "grey", alias = "greyscale")]
    Grayscale,
    /// An `[r, g, b]` triplet per pixel
    #[serde(alias = "colour", alias = "rgb")]
    Color,
}

impl std::fmt::Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::Grayscale => write!(f, "grayscale"),
            ColorMode::Color => write!(f, "color"),
        }
    }
}

/// Batch inference configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct InferenceConfig {
    #[serde(default)]
    pub color_mode: ColorMode,
}

/// Graceful shutdown configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShutdownConfig {
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

fn default_grace_period() -> u64 {
    5
}

impl ShutdownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from `config/proxy.yaml` and the process environment
    pub fn load() -> Result<Self> {
        let env: Map<String, String> = std::env::vars().collect();
        Self::load_with_env(Some(Path::new("config/proxy.yaml")), env)
    }

    /// Load settings from an optional YAML file and an explicit environment.
    ///
    /// Precedence, lowest first: defaults, file, `MODZY_PROXY__*` variables,
    /// then the legacy pipeline variables (`PROXY_PORT`, `KFSERVING_PORT`,
    /// `MODEL_NAME`, `IMAGE_TYPE`).
    pub fn load_with_env(path: Option<&Path>, env: Map<String, String>) -> Result<Self> {
        let mut config_builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("upstream.port", default_upstream_port() as i64)?
            .set_default("upstream.model_name", "")?
            .set_default("upstream.timeout_ms", default_timeout() as i64)?
            .set_default("upstream.max_request_bytes", default_max_request_bytes() as i64)?
            .set_default("inference.color_mode", "grayscale")?
            .set_default("shutdown.grace_period_secs", default_grace_period() as i64)?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", default_log_format())?;

        if let Some(path) = path {
            if path.exists() {
                let format = if path.extension().map_or(false, |ext| ext == "toml") {
                    FileFormat::Toml
                } else {
                    FileFormat::Yaml
                };
                config_builder = config_builder.add_source(File::from(path).format(format));
            }
        }

        config_builder = config_builder.add_source(
            Environment::with_prefix("MODZY_PROXY")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        for (var, key) in LEGACY_ENV_OVERRIDES {
            if let Some(value) = env.get(var).filter(|v| !v.trim().is_empty()) {
                config_builder = config_builder.set_override(key, value.trim().to_string())?;
            }
        }

        let settings: Settings = config_builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.upstream.port == 0 {
            return Err(invalid("Upstream port cannot be 0"));
        }

        let model_name = self.upstream.model_name.trim();
        if model_name.is_empty() {
            return Err(invalid("Model name must be set (MODEL_NAME)"));
        }
        if model_name.contains('/') || model_name == "." || model_name == ".." {
            return Err(invalid(&format!(
                "Model name '{}' is not a valid path segment",
                model_name
            )));
        }

        if self.shutdown.grace_period_secs == 0 {
            return Err(invalid("Shutdown grace period must be at least 1 second"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            upstream: UpstreamConfig {
                port: default_upstream_port(),
                model_name: String::new(),
                timeout_ms: default_timeout(),
                max_request_bytes: default_max_request_bytes(),
            },
            inference: InferenceConfig::default(),
            shutdown: ShutdownConfig {
                grace_period_secs: default_grace_period(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
