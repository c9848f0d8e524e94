//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init logging → Init metrics → Bind listener → Serve
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Startup errors are values; only `main` turns them into an exit code
//! - In-flight requests are drained on shutdown, never cut off

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{StartupError, EXIT_BIND_FAILURE};
