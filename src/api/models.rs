//! API request and response models

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::batch::BatchResult;
use crate::error::{AppError, Result};

/// Batch inference request sent by the calling platform
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BatchRequest {
    /// Job type; required but not otherwise interpreted
    #[serde(rename = "type")]
    pub job_type: String,

    /// Directory holding the input files; must exist
    pub input: String,

    /// Directory receiving `<name>.json` results; created when missing
    pub output: String,
}

impl BatchRequest {
    /// All fields are required and must be non-empty
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("type", &self.job_type),
            ("input", &self.input),
            ("output", &self.output),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidRequest(format!(
                    "Field '{}' is required",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Envelope used by status and error responses
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,

    /// Canonical reason phrase for `status_code`
    pub status: String,

    pub message: String,

    /// Files written successfully (batch responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<Vec<String>>,

    /// Files that could not be processed (batch responses only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<Vec<String>>,
}

impl ResponseEnvelope {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.as_u16(),
            status: code.canonical_reason().unwrap_or_default().to_string(),
            message: message.into(),
            processed: None,
            failed: None,
        }
    }

    pub fn with_batch(mut self, result: &BatchResult) -> Self {
        self.processed = Some(result.processed.clone());
        self.failed = Some(result.failed.clone());
        self
    }
}
