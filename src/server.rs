//! HTTP surface of the execution service
//!
//! One route: POST /run. The handler validates the body, stages the
//! program into a request-scoped temp directory, delegates to the
//! injected invoker, and shapes the reply envelope. Failures local to a
//! request are converted to enveloped responses at this boundary and
//! never take down the listener.

use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use thiserror::Error;
use tracing::{error, info};

use crate::invoker::Invoker;
use crate::protocol::{ErrorReply, ReplyStatus, RequestError, RunReply, RunRequest};

/// Dependencies injected into the /run handler
#[derive(Clone)]
pub struct AppState {
    pub invoker: Arc<dyn Invoker>,
    pub default_timeout_secs: u64,
}

/// Build the service router with its dependencies injected
pub fn router(state: AppState) -> Router {
    Router::new().route("/run", post(run)).with_state(state)
}

/// Failures surfaced to the client as enveloped HTTP errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    BadRequest(#[from] RequestError),
    #[error("Server error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let code = match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let reply = ErrorReply {
            status: ReplyStatus::Error,
            message: self.to_string(),
        };
        (code, Json(reply)).into_response()
    }
}

async fn run(State(state): State<AppState>, body: Bytes) -> Result<Response, ServiceError> {
    let request = RunRequest::parse(&body, state.default_timeout_secs)?;
    info!(
        "Received run request: {} bytes of program, timeout {}s",
        request.program.len(),
        request.timeout_secs
    );

    // The TempDir guard removes the staged program on every exit path.
    let staging = tempfile::tempdir().context("Failed to create staging directory")?;
    let program_path = staging.path().join("program.data");
    tokio::fs::write(&program_path, &request.program)
        .await
        .context("Failed to stage program")?;

    let result = state
        .invoker
        .invoke(&program_path, request.timeout_secs)
        .await;
    info!("Run finished: success={}", result.is_success());

    Ok((StatusCode::OK, Json(RunReply::from_result(result))).into_response())
}
