//! Directory-driven batch inference

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::batch::classifier::{self, ContentType, FileRecord};
use crate::batch::payload::build_payload;
use crate::config::ColorMode;
use crate::error::{AppError, Result};
use crate::upstream::InferenceBackend;

/// Outcome of one batch.
///
/// Every non-hidden, non-directory entry lands in exactly one list. Hidden
/// files and directories are reported as failed too. Order follows the
/// directory listing, which the filesystem does not guarantee to be sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub processed: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn processed_list(&self) -> String {
        self.processed.join(", ")
    }

    pub fn failed_list(&self) -> String {
        self.failed.join(", ")
    }
}

/// Why a single file was not processed
#[derive(Debug)]
enum FileFailure {
    Unsupported,
    Inference(AppError),
    Write(std::io::Error),
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFailure::Unsupported => write!(f, "unsupported content"),
            FileFailure::Inference(e) => write!(f, "inference failed: {}", e),
            FileFailure::Write(e) => write!(f, "failed to write result: {}", e),
        }
    }
}

/// Runs classification, encoding, inference and persistence per file
pub struct BatchOrchestrator {
    backend: Arc<dyn InferenceBackend>,
    color_mode: ColorMode,
}

impl BatchOrchestrator {
    pub fn new(backend: Arc<dyn InferenceBackend>, color_mode: ColorMode) -> Self {
        Self {
            backend,
            color_mode,
        }
    }

    /// Process every entry of `input`, writing `<name>.json` results to `output`.
    ///
    /// Only a missing or unlistable input directory fails the call; per-file
    /// problems are collected in [`BatchResult::failed`].
    pub async fn run(&self, input: &Path, output: &Path) -> Result<BatchResult> {
        if !fs::try_exists(input).await.unwrap_or(false) {
            return Err(AppError::DirectoryNotFound(input.display().to_string()));
        }

        // Failure here surfaces as per-file write errors below
        if let Err(e) = fs::create_dir_all(output).await {
            warn!(output = %output.display(), error = %e, "Failed to create output directory");
        }

        let mut entries = fs::read_dir(input).await?;
        let mut result = BatchResult::default();

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();

            match self.process_entry(&name, entry.path(), output).await {
                Ok(()) => {
                    info!(file = %name, "File processed");
                    result.processed.push(name);
                }
                Err(reason) => {
                    warn!(file = %name, reason = %reason, "File not processed");
                    result.failed.push(name);
                }
            }
        }

        info!(
            processed = result.processed.len(),
            failed = result.failed.len(),
            "Batch finished"
        );

        Ok(result)
    }

    async fn process_entry(
        &self,
        name: &str,
        path: PathBuf,
        output: &Path,
    ) -> std::result::Result<(), FileFailure> {
        let (record, contents) = classify_entry(name, path).await;
        if !record.content_type.is_supported() {
            return Err(FileFailure::Unsupported);
        }

        info!(file = %record.path.display(), content_type = %record.content_type, "Processing file");

        let payload = build_payload(record.content_type, contents, self.color_mode)
            .await
            .map_err(FileFailure::Inference)?;

        let body = self
            .backend
            .infer(payload)
            .await
            .map_err(FileFailure::Inference)?;

        fs::write(output.join(format!("{}.json", record.name)), &body)
            .await
            .map_err(FileFailure::Write)
    }
}

/// Classify a directory entry, returning the bytes read for sniffing
async fn classify_entry(name: &str, path: PathBuf) -> (FileRecord, Vec<u8>) {
    let is_dir = fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let mut record = FileRecord {
        name: name.to_string(),
        path,
        content_type: ContentType::Unsupported,
    };

    if !classifier::is_candidate(name, is_dir) {
        return (record, Vec::new());
    }

    match fs::read(&record.path).await {
        Ok(contents) => {
            record.content_type = classifier::classify(name, &contents);
            (record, contents)
        }
        Err(e) => {
            warn!(file = %record.path.display(), error = %e, "Failed to read file");
            (record, Vec::new())
        }
    }
}
