//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Strip the mount prefix and dispatch to the route table
//! - Forward buffered or streaming calls through the shared HttpClient
//! - Swap in new route tables on config reload

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use arc_swap::ArcSwap;
use futures_util::stream::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::client::{self, ClientError, HttpClient};
use crate::config::{GatewayConfig, GatewaySettings};
use crate::http::request::{end_to_end, forward_headers};
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::observability::tracing::{request_id, request_span, MakeRequestUuid};
use crate::routing::matcher::PathPrefix;
use crate::routing::{RouteMatch, RouteTable};

/// Route table shared between the handler, the admin API and the reloader.
pub type SharedRoutes = Arc<ArcSwap<RouteTable>>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: SharedRoutes,
    pub client: Arc<HttpClient>,
    pub mount: Arc<PathPrefix>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(settings: &GatewaySettings, routes: SharedRoutes, client: Arc<HttpClient>) -> Self {
        let state = AppState {
            routes,
            client,
            mount: Arc::new(PathPrefix::new(&settings.normalized_prefix())),
            max_body_bytes: settings.max_body_bytes,
        };
        Self {
            router: Self::build_router(settings, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(settings: &GatewaySettings, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
                    .layer(TimeoutLayer::new(Duration::from_secs(settings.request_timeout_secs))),
            )
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight calls.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Gateway server draining connections");
            })
            .await?;

        tracing::info!("Gateway server stopped");
        Ok(())
    }
}

/// Rebuild and swap the route table for every config the watcher emits.
/// Invalid route sets are logged and the current table kept.
pub async fn apply_route_updates(
    routes: SharedRoutes,
    mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => {
                let Some(config) = update else { break };
                match RouteTable::from_config(&config.routes) {
                    Ok(table) => {
                        tracing::info!(routes = table.len(), "Route table reloaded");
                        routes.store(Arc::new(table));
                    }
                    Err(e) => tracing::error!(error = %e, "Rejected reloaded routes, keeping current table"),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}

/// Main proxy handler.
/// Strips the mount prefix, looks up the route and forwards the call.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let matched = state
        .mount
        .strip(&path)
        .map(|inner| if inner.is_empty() { "/" } else { inner })
        .and_then(|inner| state.routes.load().match_route(&method, inner));

    let Some(RouteMatch { route, suffix }) = matched else {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
        metrics::record_request(method.as_str(), 404, "none", start);
        return GatewayError::NoRoute(path).into_response();
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        route = %route.name(),
        "Proxying request"
    );

    let response = match forward(&state, request, &route, &suffix).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(request_id = %request_id, route = %route.name(), error = %e, "Forwarding failed");
            e.into_response()
        }
    };
    metrics::record_request(method.as_str(), response.status().as_u16(), route.name(), start);
    response
}

async fn forward(
    state: &AppState,
    request: Request<Body>,
    route: &crate::routing::ProxyRoute,
    suffix: &str,
) -> Result<Response, GatewayError> {
    let url = route.upstream_url(suffix, request.uri().query())?;
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| GatewayError::BodyTooLarge(state.max_body_bytes))?;

    let outbound = client::Request::new(
        parts.method,
        url,
        forward_headers(&parts.headers, peer),
        body,
        state.client.default_timeout(),
    );

    if route.streaming() {
        relay_stream(state.client.stream_request(outbound).await?).await
    } else {
        let response = state.client.request(outbound).await?;
        let (status, headers, body) = response.into_parts();
        let mut relayed = Response::new(Body::from(body));
        *relayed.status_mut() = status;
        *relayed.headers_mut() = end_to_end(&headers);
        Ok(relayed)
    }
}

/// Answer with the upstream head once the first chunk arrives, then pipe the
/// rest of the chunks in order.
async fn relay_stream(mut stream: client::ChunkStream) -> Result<Response, GatewayError> {
    let first = match stream.next().await {
        Some(chunk) => chunk?,
        None => return Err(ClientError::Transport("upstream closed before the response head".into()).into()),
    };

    let status = first.status().unwrap_or(StatusCode::OK);
    let headers = first.headers().map(end_to_end).unwrap_or_default();
    let head = futures_util::stream::once(async move { Ok::<_, ClientError>(first.into_data()) });
    let rest = stream.map(|chunk| chunk.map(client::StreamChunk::into_data));

    let mut response = Response::new(Body::from_stream(head.chain(rest)));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
