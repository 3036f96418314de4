//! Upstream module - route table, inference client, and passthrough proxy

pub mod client;
pub mod proxy;
pub mod routes;

pub use client::{InferenceBackend, KfServingClient};
pub use proxy::{resolve_redirect, Forwarder, PassthroughRoute, RedirectTarget};
pub use routes::RouteTable;
