//! HTTP client for the KFServing inference and status routes

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;
use reqwest::{header::CONTENT_TYPE, Client};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::upstream::routes::RouteTable;

/// The model server as seen by the batch pipeline
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// POST an encoded payload to the infer route.
    ///
    /// Only a 200 counts as success; the body is returned untouched.
    async fn infer(&self, payload: Vec<u8>) -> Result<Bytes>;

    /// GET the status route and return its status code when it is 200
    async fn status(&self) -> Result<StatusCode>;
}

/// KFServing v2 backend reached over HTTP
pub struct KfServingClient {
    client: Client,
    routes: RouteTable,
}

impl KfServingClient {
    pub fn new(config: &UpstreamConfig, routes: RouteTable) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, routes })
    }
}

#[async_trait]
impl InferenceBackend for KfServingClient {
    async fn infer(&self, payload: Vec<u8>) -> Result<Bytes> {
        let url = self.routes.infer().clone();
        debug!(url = %url, bytes = payload.len(), "Sending inference request");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(status = %status, "Model server rejected inference request");
            return Err(AppError::UpstreamStatus(status));
        }

        Ok(response.bytes().await?)
    }

    async fn status(&self) -> Result<StatusCode> {
        let response = self.client.get(self.routes.status().clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(AppError::UpstreamStatus(status));
        }

        Ok(status)
    }
}
