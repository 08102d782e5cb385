//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the `/todos` handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Serve until the shutdown broadcast fires

use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::handlers::{
    create_item, delete_item, get_item, list_items, missing_id, update_item,
};
use crate::observability::metrics;
use crate::store::Store;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
}

/// HTTP server exposing the store.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over `store`.
    pub fn new(config: &AppConfig, store: Arc<dyn Store>) -> Self {
        let state = AppState { store };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route(
                "/todos",
                get(list_items)
                    .post(create_item)
                    .put(missing_id)
                    .delete(missing_id),
            )
            .route(
                "/todos/{id}",
                get(get_item).put(update_item).delete(delete_item),
            )
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let response = next.run(request).await;

    let status = response.status();
    tracing::debug!(
        request_id = %request_id,
        method = %method,
        status = %status,
        "Request handled"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);
    response
}
