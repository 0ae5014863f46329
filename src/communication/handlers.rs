use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::local::LocalProcessor;
use super::protocol::{self, CONTENT_TYPE_BINCODE, ErrorResponse};
use crate::command::Command;
use crate::error::ClusterError;
use crate::executor::types::ExecutorStats;
use crate::router::Router;

/// Applies a command sent by another node and answers with the bincode
/// `RemoteReply`.
pub async fn handle_internal_command(
    Extension(local): Extension<Arc<LocalProcessor>>,
    body: Bytes,
) -> Response {
    let command = match protocol::decode_command(&body) {
        Ok(command) => command,
        Err(e) => {
            tracing::error!("Failed to decode internal command: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let reply = local.execute(command).await;

    match protocol::encode_reply(&reply) {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE_BINCODE)],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode reply: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Resolves a client command with this node as coordinator.
pub async fn handle_command(
    Extension(router): Extension<Arc<Router>>,
    Json(command): Json<Command>,
) -> Response {
    match command.resolve(&router).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::warn!("{} ({}) failed: {}", command.name(), command.id, e);
            (status_for(&e), Json(ErrorResponse::from(&e))).into_response()
        }
    }
}

pub fn status_for(e: &ClusterError) -> StatusCode {
    match e {
        ClusterError::MissingRoute(_) => StatusCode::SERVICE_UNAVAILABLE,
        ClusterError::Communication(_) => StatusCode::BAD_GATEWAY,
        ClusterError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Returns once every running command has finished.
pub async fn handle_pause(
    Extension(local): Extension<Arc<LocalProcessor>>,
) -> (StatusCode, Json<ExecutorStats>) {
    local.executor().pause().await;
    (StatusCode::OK, Json(local.executor().stats()))
}

pub async fn handle_resume(
    Extension(local): Extension<Arc<LocalProcessor>>,
) -> (StatusCode, Json<ExecutorStats>) {
    local.executor().resume();
    (StatusCode::OK, Json(local.executor().stats()))
}

pub async fn handle_stats(
    Extension(local): Extension<Arc<LocalProcessor>>,
) -> (StatusCode, Json<ExecutorStats>) {
    (StatusCode::OK, Json(local.executor().stats()))
}
