//! KFServing Proxy
//!
//! Sits in front of a co-located KFServing model server. Passthrough routes are
//! forwarded verbatim; `/run` drives directory batch inference, turning images
//! into pixel tensors and writing each result beside the inputs.

pub mod api;
pub mod batch;
pub mod config;
pub mod error;
pub mod server;
pub mod upstream;

pub use error::{AppError, Result};

use std::sync::Arc;

use batch::BatchOrchestrator;
use server::ShutdownSignal;
use upstream::{Forwarder, InferenceBackend, KfServingClient, RouteTable};

/// Application state shared across all handlers
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub backend: Arc<dyn InferenceBackend>,
    pub orchestrator: Arc<BatchOrchestrator>,
    pub forwarder: Forwarder,
    pub shutdown: ShutdownSignal,
}

impl AppState {
    /// Wire every component from validated settings
    pub fn from_settings(settings: config::Settings, shutdown: ShutdownSignal) -> Result<Self> {
        let routes = RouteTable::new(&settings.upstream)?;
        let backend: Arc<dyn InferenceBackend> =
            Arc::new(KfServingClient::new(&settings.upstream, routes.clone())?);
        let orchestrator = Arc::new(BatchOrchestrator::new(
            backend.clone(),
            settings.inference.color_mode,
        ));
        let forwarder = Forwarder::new(&settings.upstream)?;

        Ok(Self {
            routes: Arc::new(routes),
            backend,
            orchestrator,
            forwarder,
            shutdown,
        })
    }
}
