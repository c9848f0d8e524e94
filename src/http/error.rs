//! Error types for the HTTP layer.
//!
//! Every per-request failure becomes a [`ProxyError`], which maps onto the
//! status code the client sees. Nothing is retried and nothing leaks into
//! other requests.

use axum::http::header::InvalidHeaderName;
use axum::http::uri::InvalidUri;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::transform::TranscodeError;

/// Failure while proxying a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("invalid upstream URI `{uri}`: {source}")]
    UpstreamUri {
        uri: String,
        #[source]
        source: InvalidUri,
    },

    #[error("failed to build upstream request: {0}")]
    UpstreamRequest(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    UpstreamBody(#[source] axum::Error),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("upstream task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ProxyError {
    /// Status code returned to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::UpstreamBody(_) => StatusCode::BAD_GATEWAY,
            Self::Transcode(TranscodeError::Encode { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Transcode(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamUri { .. } | Self::UpstreamRequest(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label for `proxy_upstream_errors_total`, if this is an upstream failure.
    pub fn upstream_kind(&self) -> Option<&'static str> {
        match self {
            Self::Upstream(_) | Self::UpstreamBody(_) => Some("transport"),
            Self::Transcode(TranscodeError::Encode { .. }) => Some("encode"),
            Self::Transcode(_) => Some("decode"),
            _ => None,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::RequestBody(_) => "Failed to read request body",
            Self::Upstream(_) | Self::UpstreamBody(_) => "Upstream request failed",
            Self::Transcode(TranscodeError::Encode { .. }) => "Failed to encode response body",
            Self::Transcode(_) => "Failed to decode upstream response body",
            Self::UpstreamUri { .. } | Self::UpstreamRequest(_) | Self::Task(_) => {
                "Internal proxy error"
            }
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

/// Failure while constructing the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid tenant header `{name}`: {source}")]
    TenantHeader {
        name: String,
        #[source]
        source: InvalidHeaderName,
    },

    #[error("failed to build sanitizer for field `{field}`: {source}")]
    Sanitizer {
        field: String,
        #[source]
        source: regex::Error,
    },
}
