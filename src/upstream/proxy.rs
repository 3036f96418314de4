//! Passthrough forwarding to the model server
//!
//! Resolution is a pure mapping from the matched route and the incoming
//! headers to a [`RedirectTarget`]; [`Forwarder`] then replays the request
//! against that target and hands the upstream response back unmodified.

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    response::Response,
};
use futures::StreamExt;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{AppError, Result};
use crate::upstream::routes::RouteTable;

/// Headers scoped to a single connection, never forwarded by a proxy
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Routes whose only behavior is forwarding to the model server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughRoute {
    /// `/v2/models/`
    Models,
    /// `/v2/models/:name/status`
    Status,
    /// `/v2/models/:name/infer`
    Infer,
    /// `/v2/models/:name/explain`
    Explain,
}

impl PassthroughRoute {
    pub fn upstream_url<'a>(&self, routes: &'a RouteTable) -> &'a Url {
        match self {
            PassthroughRoute::Models => routes.base_url(),
            PassthroughRoute::Status => routes.status(),
            PassthroughRoute::Infer => routes.infer(),
            PassthroughRoute::Explain => routes.explain(),
        }
    }
}

/// Where and with which headers a passthrough request is replayed
#[derive(Debug, Clone)]
pub struct RedirectTarget {
    pub url: Url,
    pub headers: HeaderMap,
}

/// Map an incoming passthrough request onto the upstream.
///
/// The incoming model name segment is ignored; the configured model is always
/// targeted. Query strings survive, `Host` is rewritten, hop-by-hop headers are
/// dropped and everything else passes through.
pub fn resolve_redirect(
    route: PassthroughRoute,
    routes: &RouteTable,
    query: Option<&str>,
    incoming: &HeaderMap,
) -> RedirectTarget {
    let mut url = route.upstream_url(routes).clone();
    url.set_query(query);

    let mut headers = strip_hop_by_hop(incoming);
    headers.remove(header::CONTENT_LENGTH);
    if let Some(authority) = authority(&url) {
        if let Ok(value) = HeaderValue::from_str(&authority) {
            headers.insert(header::HOST, value);
        }
    }

    RedirectTarget { url, headers }
}

fn authority(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    // Headers named in `Connection` are hop-by-hop as well
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = headers.clone();
    for name in HOP_BY_HOP {
        out.remove(name);
    }
    for name in listed {
        out.remove(name);
    }
    out
}

/// Replays requests against a [`RedirectTarget`]
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    max_request_bytes: usize,
}

impl Forwarder {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_request_bytes: config.max_request_bytes,
        })
    }

    /// Forward the request and stream the upstream response back
    pub async fn forward(&self, method: Method, target: RedirectTarget, body: Body) -> Result<Response> {
        let body = read_bounded(body, self.max_request_bytes).await?;

        debug!(method = %method, url = %target.url, "Forwarding request upstream");

        let upstream = self
            .client
            .request(method, target.url.clone())
            .headers(target.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %target.url, error = %e, "Upstream request failed");
                AppError::Proxy(e.to_string())
            })?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

/// Buffer a request body, failing with 413 once it grows past `limit`
async fn read_bounded(body: Body, limit: usize) -> Result<Bytes> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| AppError::InvalidRequest(format!("Failed to read request body: {}", e)))?;
        if buf.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge(limit));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(buf))
}
