//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port non-zero, pattern shape)
//! - Check the upstream URL is something the HTTP client can reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: &ProxyConfig → Result<(), Vec<ValidationError>>

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("pattern `{pattern}` {reason}")]
    Pattern { pattern: String, reason: &'static str },

    #[error("port must be non-zero")]
    Port,

    #[error("prometheus_server `{url}` is invalid: {reason}")]
    Upstream { url: String, reason: String },

    #[error("tenant_header `{0}` is not a valid header name")]
    TenantHeader(String),

    #[error("sensitive_field must not be empty")]
    SensitiveField,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(reason) = check_pattern(&config.pattern) {
        errors.push(ValidationError::Pattern {
            pattern: config.pattern.clone(),
            reason,
        });
    }

    if config.port == 0 {
        errors.push(ValidationError::Port);
    }

    if let Err(reason) = check_upstream(&config.upstream) {
        errors.push(ValidationError::Upstream {
            url: config.upstream.clone(),
            reason,
        });
    }

    if HeaderName::from_bytes(config.tenant_header.as_bytes()).is_err() {
        errors.push(ValidationError::TenantHeader(config.tenant_header.clone()));
    }

    if config.sensitive_field.is_empty() {
        errors.push(ValidationError::SensitiveField);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Patterns are literal paths; route syntax would change what they match.
fn check_pattern(pattern: &str) -> Result<(), &'static str> {
    if !pattern.starts_with('/') {
        return Err("must start with '/'");
    }
    if pattern.contains(['{', '}']) {
        return Err("must not contain '{' or '}'");
    }
    if pattern
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err("must not contain ':' or '*' segments");
    }
    Ok(())
}

fn check_upstream(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() {
        return Err("must not carry a query string".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn rejects_route_syntax_in_pattern() {
        for pattern in ["api", "/api/{id}", "/:tenant/", "/files/*rest"] {
            let config = ProxyConfig {
                pattern: pattern.into(),
                ..Default::default()
            };
            let errors = validate_config(&config).unwrap_err();
            assert!(matches!(errors[0], ValidationError::Pattern { .. }), "{pattern}");
        }
    }

    #[test]
    fn rejects_https_upstream() {
        let config = ProxyConfig {
            upstream: "https://prom.example.com".into(),
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Upstream { .. }));
    }

    #[test]
    fn rejects_garbage_upstream_and_header() {
        let config = ProxyConfig {
            upstream: "not a url".into(),
            tenant_header: "bad header".into(),
            sensitive_field: String::new(),
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::SensitiveField));
    }
}
