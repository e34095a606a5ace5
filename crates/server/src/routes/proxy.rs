//! Page requests: through the worker, or straight to the origin when bypassed.

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, header};
use rewind_client::Network;
use rewind_core::{CacheStore, Request, ResponseSnapshot};
use rewind_worker::FetchOutcome;

use crate::error::ServerError;
use crate::handler::AppState;

/// Response header naming where the body came from.
pub const SOURCE_HEADER: &str = "x-rewind-source";

/// Largest request body forwarded upstream.
const MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;

pub async fn dispatch<S, N>(
    State(state): State<AppState<S, N>>, request: http::Request<Body>,
) -> Result<Response, ServerError>
where
    S: CacheStore + 'static,
    N: Network + 'static,
{
    let request = into_worker_request(&state, request).await?;

    match state.worker.handle_fetch(&request).await {
        FetchOutcome::Respond { response, source } => Ok(into_http_response(response, source.as_str())),
        FetchOutcome::Bypass(reason) => {
            tracing::debug!(method = %request.method, url = %request.url, %reason, "forwarding bypassed request");
            let response = state
                .network
                .fetch(&request)
                .await
                .map_err(|e| ServerError::Upstream(e.to_string()))?;
            Ok(into_http_response(response, "bypass"))
        }
    }
}

async fn into_worker_request<S, N>(
    state: &AppState<S, N>, request: http::Request<Body>,
) -> Result<Request, ServerError> {
    let (parts, body) = request.into_parts();
    // Only path and query come from the client; scheme and authority are always the origin's.
    let mut url = state.origin.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());
    let body = to_bytes(body, MAX_REQUEST_BYTES)
        .await
        .map_err(|e| rewind_core::Error::InvalidInput(format!("unreadable request body: {e}")))?;

    let mut request = Request::new(parts.method, url).with_body(body);
    request.headers = parts.headers;
    Ok(request)
}

fn into_http_response(snapshot: ResponseSnapshot, source: &'static str) -> Response {
    let mut headers = snapshot.headers;
    for name in [header::CONTENT_LENGTH, header::TRANSFER_ENCODING, header::CONNECTION] {
        headers.remove(name);
    }
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(source));
    (snapshot.status, headers, Body::from(snapshot.body)).into_response()
}
