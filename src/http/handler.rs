//! HTTP handlers for UUID lookups and the read-only entity view

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::graph::{EdgeId, EntityKind, GraphDatabase, NodeId, TxError};
use crate::identity::{LookupError, LookupService};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<GraphDatabase>,
    pub lookup: LookupService,
}

/// Failure of a handler, rendered as a plain-text response
#[derive(Debug)]
pub enum ApiError {
    NotFound,
    Internal(String),
}

impl From<LookupError> for ApiError {
    fn from(_: LookupError) -> Self {
        ApiError::NotFound
    }
}

impl From<TxError> for ApiError {
    fn from(e: TxError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

fn resolve(state: &AppState, module: Option<&str>, kind: EntityKind, uuid: &str) -> Result<String, ApiError> {
    let id = state.lookup.resolve(module, kind, uuid)?;
    Ok(id.as_u64().to_string())
}

/// `GET /uuid/node/:uuid`, against the default module
pub async fn default_node_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<String, ApiError> {
    resolve(&state, None, EntityKind::Node, &uuid)
}

/// `GET /uuid/:module/node/:uuid`
pub async fn node_handler(
    State(state): State<AppState>,
    Path((module, uuid)): Path<(String, String)>,
) -> Result<String, ApiError> {
    resolve(&state, Some(&module), EntityKind::Node, &uuid)
}

/// `GET /uuid/relationship/:uuid`, against the default module
pub async fn default_relationship_handler(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<String, ApiError> {
    resolve(&state, None, EntityKind::Relationship, &uuid)
}

/// `GET /uuid/:module/relationship/:uuid`
pub async fn relationship_handler(
    State(state): State<AppState>,
    Path((module, uuid)): Path<(String, String)>,
) -> Result<String, ApiError> {
    resolve(&state, Some(&module), EntityKind::Relationship, &uuid)
}

/// `GET /db/node/:id`
pub async fn get_node_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let node = state.db.node(NodeId::new(id))?.ok_or(ApiError::NotFound)?;
    Ok(Json(node.to_json()))
}

/// `GET /db/relationship/:id`
pub async fn get_relationship_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let edge = state.db.edge(EdgeId::new(id))?.ok_or(ApiError::NotFound)?;
    Ok(Json(edge.to_json()))
}

/// Handler for system status
pub async fn status_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (nodes, edges) = state.db.read(|store| (store.node_count(), store.edge_count()))?;
    let modules: Vec<serde_json::Value> = state
        .lookup
        .registry()
        .modules()
        .map(|m| {
            json!({
                "name": m.name(),
                "track": m.config().track,
                "nodes": m.index().len(EntityKind::Node),
                "relationships": m.index().len(EntityKind::Relationship),
            })
        })
        .collect();

    Ok(Json(json!({
        "status": "healthy",
        "version": crate::VERSION,
        "durable": state.db.is_durable(),
        "storage": {
            "nodes": nodes,
            "edges": edges,
        },
        "modules": modules,
    })))
}
