//! Response body transformation.
//!
//! # Data Flow
//! ```text
//! upstream body (possibly compressed)
//!     → encoding.rs (decode per Content-Encoding)
//!     → sanitize.rs (strip the sensitive field)
//!     → encoding.rs (re-encode with the same scheme)
//!     → client
//! ```
//!
//! # Design Decisions
//! - Bodies are buffered in full; nothing reaches the client before sanitizing
//! - Only JSON/text bodies are sanitized, anything else passes through
//! - A body that cannot be decoded is an error, never forwarded half-done

pub mod encoding;
pub mod sanitize;

pub use encoding::{ContentEncoding, TranscodeError};
pub use sanitize::Sanitizer;
