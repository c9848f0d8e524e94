//! Request orchestration: rewrite, forward, sanitize.
//!
//! # Flow
//! ```text
//! inbound request
//!     → tenant id from the tenant header (missing = "")
//!     → query.rs rewrites `query` / `match[]`
//!     → upstream request (same method, body, first-value headers)
//!     → full upstream body
//!     → decode → sanitize → encode (same Content-Encoding)
//!     → response with upstream status and first-value headers
//! ```

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, Request, Uri},
    response::{IntoResponse, Response},
};
use std::borrow::Cow;
use std::time::Instant;

use crate::http::error::ProxyError;
use crate::http::headers;
use crate::http::query;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::transform::{sanitize, ContentEncoding, Sanitizer};

/// Main proxy handler.
pub async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(method = %method, path = %path, "Proxying request");

    let response = match forward(&state, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Proxy request failed");
            if let Some(kind) = e.upstream_kind() {
                metrics::record_upstream_error(kind);
            }
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response
}

async fn forward(state: &AppState, request: Request<Body>) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let tenant = tenant_id(&parts.headers, &state.tenant_header);
    let query = query::rewrite_query_string(parts.uri.query(), tenant);
    let uri = upstream_uri(state.config.upstream_base(), parts.uri.path(), &query)?;

    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(ProxyError::RequestBody)?;

    let mut upstream_request = Request::builder()
        .method(parts.method)
        .uri(uri)
        .body(Body::from(body))?;
    *upstream_request.headers_mut() = headers::upstream_request_headers(&parts.headers);

    // Spawned so the round-trip completes even if the client goes away.
    let client = state.client.clone();
    let (upstream, body) = tokio::spawn(async move {
        let response = client.request(upstream_request).await?;
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), usize::MAX)
            .await
            .map_err(ProxyError::UpstreamBody)?;
        Ok::<_, ProxyError>((parts, body))
    })
    .await??;

    tracing::debug!(status = %upstream.status, bytes = body.len(), "Upstream responded");

    let body = transform_body(&state.sanitizer, &upstream.headers, body)?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers::client_response_headers(&upstream.headers);
    Ok(response)
}

/// Tenant identifier carried by the request; absent or non-ASCII reads as "".
pub fn tenant_id<'a>(headers: &'a HeaderMap, name: &HeaderName) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `{base}{path}?{query}`; the query part is omitted when empty.
pub fn upstream_uri(base: &str, path: &str, query: &str) -> Result<Uri, ProxyError> {
    let uri = if query.is_empty() {
        format!("{base}{path}")
    } else {
        format!("{base}{path}?{query}")
    };
    uri.parse()
        .map_err(|source| ProxyError::UpstreamUri { uri, source })
}

/// Decode, sanitize and re-encode an upstream body.
///
/// Bodies that are not JSON/text, or use an encoding this proxy cannot
/// reverse, are returned as-is. So is a body with nothing to strip, which
/// spares a re-compression.
pub fn transform_body(
    sanitizer: &Sanitizer,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Bytes, ProxyError> {
    if !sanitize::is_textual(headers) {
        return Ok(body);
    }

    let encoding = ContentEncoding::from_headers(headers);
    if let ContentEncoding::Unsupported(tag) = &encoding {
        tracing::warn!(encoding = %tag, "Cannot decode upstream body, forwarding unsanitized");
        return Ok(body);
    }

    let decoded = encoding.decode(body.clone())?;
    match sanitizer.sanitize_bytes(&decoded) {
        Cow::Borrowed(_) => Ok(body),
        Cow::Owned(clean) => {
            tracing::debug!(
                field = %sanitizer.field(),
                removed = decoded.len() - clean.len(),
                "Sanitized upstream body"
            );
            Ok(encoding.encode(Bytes::from(clean))?)
        }
    }
}
