//! Upstream URL construction for the co-located model server

use reqwest::Url;

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};

/// The model server shares the container with the proxy.
pub const UPSTREAM_HOST: &str = "127.0.0.1";

/// Upstream routes resolved once at startup, read-only afterwards
#[derive(Debug, Clone)]
pub struct RouteTable {
    base_url: Url,
    status: Url,
    infer: Url,
    explain: Url,
}

impl RouteTable {
    /// Build the table for a configured upstream.
    ///
    /// A malformed base URL is a startup failure, never a per-request one.
    pub fn new(upstream: &UpstreamConfig) -> Result<Self> {
        Self::with_base(
            &format!("http://{}:{}/v2/models/", UPSTREAM_HOST, upstream.port),
            &upstream.model_name,
        )
    }

    /// Build the table against an explicit base URL
    pub fn with_base(base_url: &str, model_name: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("Invalid upstream base URL '{}': {}", base_url, e)))?;

        // `Url::join` replaces the last segment unless the path ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let model_name = model_name.trim();
        let status = build_route(&base_url, model_name, "status")?;
        let infer = build_route(&base_url, model_name, "infer")?;
        let explain = build_route(&base_url, model_name, "explain")?;

        Ok(Self {
            base_url,
            status,
            infer,
            explain,
        })
    }

    /// The models collection root, `/v2/models/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn status(&self) -> &Url {
        &self.status
    }

    pub fn infer(&self) -> &Url {
        &self.infer
    }

    pub fn explain(&self) -> &Url {
        &self.explain
    }
}

fn build_route(base_url: &Url, model_name: &str, route: &str) -> Result<Url> {
    base_url
        .join(&format!("{}/{}", model_name, route.trim_matches('/')))
        .map_err(|e| AppError::Internal(format!("Invalid upstream route '{}': {}", route, e)))
}
