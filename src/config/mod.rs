//! Configuration module

pub mod settings;

pub use settings::{
    ColorMode, InferenceConfig, LoggingConfig, ServerConfig, Settings, ShutdownConfig,
    UpstreamConfig,
};
