//! Batch resolution handler.

use crate::api::AppState;
use crate::error::Error;
use crate::stream::{NDJSON_CONTENT_TYPE, ndjson_stream};
use crate::types::ResolveRequest;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};

/// POST /resolve - Resolve a batch of links, streaming progress as NDJSON
///
/// The response starts immediately and carries one JSON event per line. It
/// ends after every link has emitted `finished` and the batch results have
/// been written to the task named by `taskId`, if any.
#[utoipa::path(
    post,
    path = "/api/v1/resolve",
    tag = "resolve",
    request_body = ResolveRequest,
    responses(
        (status = 200, description = "Progress stream, one ResolutionEvent per line", body = crate::types::ResolutionEvent, content_type = "application/x-ndjson"),
        (status = 400, description = "Malformed body or empty batch", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 503, description = "Resolver is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn resolve_links(
    State(state): State<AppState>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Response, Error> {
    let Json(mut request) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;

    let task_id = request.task_id.take().filter(|id| !id.trim().is_empty());
    let items = request.into_items()?;

    tracing::info!(links = items.len(), task_id = ?task_id, "resolve request accepted");

    let rx = state.resolver.start_batch(items, task_id)?;
    let body = Body::from_stream(ndjson_stream(rx));

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}
