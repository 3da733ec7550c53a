//! HTTP server exposing UUID lookups

use axum::{routing::get, Router};
use super::handler::{
    default_node_handler, default_relationship_handler, get_node_handler, get_relationship_handler, node_handler,
    relationship_handler, status_handler, AppState,
};
use crate::runtime::UuidRuntime;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the router; exposed separately so it can be driven without a socket
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/uuid/node/:uuid", get(default_node_handler))
        .route("/uuid/relationship/:uuid", get(default_relationship_handler))
        .route("/uuid/:module/node/:uuid", get(node_handler))
        .route("/uuid/:module/relationship/:uuid", get(relationship_handler))
        .route("/db/node/:id", get(get_node_handler))
        .route("/db/relationship/:id", get(get_relationship_handler))
        .route("/api/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(runtime: &UuidRuntime) -> Self {
        Self {
            state: AppState {
                db: runtime.database().clone(),
                lookup: runtime.lookup().clone(),
            },
        }
    }

    /// Bind `addr` and serve until the process is stopped
    pub async fn start(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        info!("UUID lookup API listening on http://{}", listener.local_addr()?);
        axum::serve(listener, router(self.state.clone())).await
    }
}
