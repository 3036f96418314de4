//! Request bodies for the model server's infer route

use crate::batch::classifier::ContentType;
use crate::batch::tensor;
use crate::config::ColorMode;
use crate::error::{AppError, Result};

/// Build the body sent for a classified file.
///
/// Images become a numeric `instances` tensor; JSON files are forwarded as-is
/// without validation.
pub async fn build_payload(
    content_type: ContentType,
    contents: Vec<u8>,
    mode: ColorMode,
) -> Result<Vec<u8>> {
    match content_type {
        ContentType::Json => Ok(contents),
        ContentType::Image => {
            let payload = tokio::task::spawn_blocking(move || tensor::encode_bytes(&contents, mode))
                .await
                .map_err(|e| AppError::Internal(format!("Image encoding task failed: {}", e)))??;
            Ok(serde_json::to_vec(&payload)?)
        }
        ContentType::Unsupported => Err(AppError::InvalidRequest(
            "Unsupported content type".to_string(),
        )),
    }
}
