//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via `metrics`)
//!
//! Consumers:
//!     → stdout or an append-only log file
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - The log sink is chosen once at startup; request handling never knows which
//! - Request ID (`x-request-id`) is attached to every request span
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
