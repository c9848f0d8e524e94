//! Tenant-isolating reverse proxy for Prometheus.
//!
//! Sits between Grafana and Prometheus. Every query arriving with an
//! `X-Grafana-Org-Id` header has the `__org_token__` placeholder in its
//! label matchers replaced with that tenant id, and every response has the
//! tenant token label stripped before it goes back to the dashboard.
//!
//! # Architecture Overview
//!
//! ```text
//!   Grafana ──▶ http::server ──▶ http::proxy ──▶ http::query ──▶ rewrite
//!                                     │
//!                                     ▼
//!                                 Prometheus
//!                                     │
//!   Grafana ◀── http::proxy ◀── transform::encoding ◀─▶ transform::sanitize
//! ```
//!
//! Cross-cutting: `config` (load once, read-only), `observability`
//! (tracing + metrics), `lifecycle` (startup, signals, shutdown).

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod transform;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
