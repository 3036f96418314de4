//! Batch module - classification, tensor encoding, and directory orchestration

pub mod classifier;
pub mod orchestrator;
pub mod payload;
pub mod tensor;

pub use classifier::{ContentType, FileRecord};
pub use orchestrator::{BatchOrchestrator, BatchResult};
pub use tensor::{Instances, TensorPayload};
