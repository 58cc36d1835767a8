// HTTP API - Read the chain, submit data, and add peers

use crate::ledger::Block;
use crate::node::{Node, NodeError};
use crate::sync::PeerInfo;
use crate::transport::PeerAddress;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Error returned by handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        let status = match &e {
            NodeError::Ledger(_) => StatusCode::CONFLICT,
            NodeError::Transport(_) | NodeError::Peer(_) => StatusCode::BAD_GATEWAY,
            NodeError::Protocol(_) | NodeError::Config(_) => StatusCode::BAD_REQUEST,
            NodeError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Response body for a successful peer connect
#[derive(Debug, Serialize)]
pub struct PeerAdded {
    pub connection_id: String,
    pub address: String,
}

/// Build the router over a shared node
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/blocks", get(blocks))
        .route("/mineBlock", post(mine_block))
        .route("/addPeer", post(add_peer))
        .route("/peers", get(peers))
        .with_state(node)
}

/// Serve the router until `shutdown` resolves
pub async fn serve(
    node: Arc<Node>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), NodeError> {
    let addr = format!(
        "{}:{}",
        node.config().http_bind_address,
        node.config().http_port
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "http surface listening");
    axum::serve(listener, router(node))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn blocks(State(node): State<Arc<Node>>) -> Json<Vec<Block>> {
    Json(node.blocks().await)
}

/// Body is the raw payload of the new block
pub async fn mine_block(
    State(node): State<Arc<Node>>,
    body: String,
) -> Result<Json<Block>, ApiError> {
    let block = node.mine_block(body).await?;
    Ok(Json(block))
}

/// Body is a peer address such as `127.0.0.1:6002`
pub async fn add_peer(
    State(node): State<Arc<Node>>,
    body: String,
) -> Result<Json<PeerAdded>, ApiError> {
    let address: PeerAddress = body.parse().map_err(|e| ApiError {
        status: StatusCode::BAD_REQUEST,
        message: format!("{}", e),
    })?;
    let id = node.connect_peer(&address).await?;
    Ok(Json(PeerAdded {
        connection_id: id.to_string(),
        address: address.to_string(),
    }))
}

pub async fn peers(State(node): State<Arc<Node>>) -> Json<Vec<PeerInfo>> {
    Json(node.peer_list().await)
}
