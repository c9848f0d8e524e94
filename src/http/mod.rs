//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → proxy.rs (tenant id, upstream call, body pipeline)
//!         → query.rs (rewrite `query` / `match[]`)
//!         → headers.rs (first-value header copies)
//!     → Send to client
//! ```

pub mod error;
pub mod headers;
pub mod proxy;
pub mod query;
pub mod server;

pub use error::{ProxyError, ServerError};
pub use server::{AppState, HttpServer};
