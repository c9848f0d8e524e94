//! Header copying between the client and upstream sides.
//!
//! Only the first value of a repeated header survives the copy. Dashboards
//! and Prometheus do not rely on repeated headers, so the map is flattened
//! rather than modelled as a multi-map.

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::transform::ContentEncoding;

/// Connection-scoped headers that must not be forwarded by a proxy.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection" | "keep-alive" | "proxy-connection" | "te" | "transfer-encoding" | "upgrade"
    )
}

/// Copy `src` into `dst`, one value per name, skipping hop-by-hop headers and `skip`.
pub fn copy_first_values(src: &HeaderMap, dst: &mut HeaderMap, skip: &[HeaderName]) {
    for name in src.keys() {
        if is_hop_by_hop(name) || skip.contains(name) {
            continue;
        }
        if let Some(value) = src.get(name) {
            dst.insert(name.clone(), value.clone());
        }
    }
}

/// Headers for the upstream request. `Host` is derived from the upstream URI,
/// and `Accept-Encoding` is narrowed to encodings the response pipeline can decode.
pub fn upstream_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.keys_len());
    copy_first_values(inbound, &mut headers, &[header::HOST]);
    if let Some(accept) = headers.get(header::ACCEPT_ENCODING) {
        let narrowed = narrow_accept_encoding(accept);
        headers.insert(header::ACCEPT_ENCODING, narrowed);
    }
    headers
}

/// Drop codings the transcoder cannot reverse; an empty result becomes `identity`.
fn narrow_accept_encoding(value: &HeaderValue) -> HeaderValue {
    let identity = HeaderValue::from_static("identity");
    let Ok(value) = value.to_str() else {
        return identity;
    };

    let kept: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|coding| {
            let name = coding.split(';').next().unwrap_or_default().trim();
            !name.is_empty() && ContentEncoding::from_tag(name).is_supported()
        })
        .collect();

    if kept.is_empty() {
        return identity;
    }
    HeaderValue::from_str(&kept.join(", ")).unwrap_or(identity)
}

/// Headers for the client response. `Content-Length` is recomputed from the final body.
pub fn client_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.keys_len());
    copy_first_values(upstream, &mut headers, &[header::CONTENT_LENGTH]);
    headers
}
