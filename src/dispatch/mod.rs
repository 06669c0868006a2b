//! Round-robin dispatcher: the public face of cluster mode.
//!
//! Accepts every inbound request on the base port and relays it to one
//! worker listener, selected round-robin. The relay is transparent: the
//! request travels to the worker unchanged and the response comes back
//! as-is. A worker that cannot be reached yields a 502; there is
//! deliberately no retry against a different worker, since a blind retry
//! could apply a create twice.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Round-robin selection over the fixed worker listeners.
pub struct Dispatcher {
    targets: Vec<u16>,
    cursor: AtomicUsize,
    client: reqwest::Client,
}

impl Dispatcher {
    /// Builds the dispatcher over the given worker ports.
    ///
    /// Redirects are disabled on the forwarding client: a redirect is a
    /// response to relay, not a hop to follow.
    pub fn new(targets: Vec<u16>) -> reqwest::Result<Self> {
        assert!(!targets.is_empty(), "dispatcher needs at least one worker");
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            targets,
            cursor: AtomicUsize::new(0),
            client,
        })
    }

    /// Selects the next worker port.
    ///
    /// The cursor advances once per inbound request (not per accepted
    /// connection), so K sequential requests land K/N on each of N workers
    /// no matter how clients reuse connections.
    fn next_target(&self) -> u16 {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.targets.len();
        self.targets[idx]
    }
}

/// Binds the public listener and serves the forwarding fallback until the
/// process is stopped.
pub async fn serve(port: u16, targets: Vec<u16>) -> io::Result<()> {
    let dispatcher = Dispatcher::new(targets).map_err(io::Error::other)?;
    let app = router(Arc::new(dispatcher));
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "dispatcher listening");
    axum::serve(listener, app).await
}

/// A fallback-only router: every request, whatever its path, goes through
/// [`forward`].
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

/// Relays one request to the selected worker and its response back.
async fn forward(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let port = dispatcher.next_target();
    let (parts, body) = request.into_parts();

    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer request body");
            return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
        }
    };

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://127.0.0.1:{port}{path_and_query}");

    let mut headers = HeaderMap::new();
    for (name, value) in &parts.headers {
        if !is_hop_header(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    let upstream = dispatcher
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body);

    match upstream.send().await {
        Ok(response) => relay(response).await,
        Err(err) => {
            warn!(port, error = %err, "worker unreachable");
            bad_gateway()
        }
    }
}

/// Copies status, headers, and body from the worker's response.
async fn relay(response: reqwest::Response) -> Response {
    let status = response.status();
    let headers = response.headers().clone();
    let body = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to read worker response");
            return bad_gateway();
        }
    };

    let mut relayed = Response::new(Body::from(body));
    *relayed.status_mut() = status;
    for (name, value) in &headers {
        if !is_hop_header(name) {
            relayed.headers_mut().append(name.clone(), value.clone());
        }
    }
    relayed
}

fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad gateway").into_response()
}

/// Headers that belong to a single hop rather than the end-to-end
/// exchange; both directions get them recomputed.
fn is_hop_header(name: &HeaderName) -> bool {
    name == header::HOST
        || name == header::CONNECTION
        || name == header::CONTENT_LENGTH
        || name == header::TRANSFER_ENCODING
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn cursor_cycles_through_targets_in_order() {
        let dispatcher = Dispatcher::new(vec![4001, 4002, 4003]).expect("client");
        let picks: Vec<u16> = (0..9).map(|_| dispatcher.next_target()).collect();
        assert_eq!(
            picks,
            vec![4001, 4002, 4003, 4001, 4002, 4003, 4001, 4002, 4003]
        );
    }

    #[tokio::test]
    async fn requests_spread_evenly_when_count_is_a_multiple_of_workers() {
        let dispatcher = Dispatcher::new(vec![5001, 5002, 5003, 5004]).expect("client");
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for _ in 0..20 {
            *counts.entry(dispatcher.next_target()).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&count| count == 5));
    }
}
