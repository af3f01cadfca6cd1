//! # OpenRAG Telemetry
//!
//! Structured logging for OpenRAG using `tracing`.
//!
//! ## Features
//! - Human-readable or JSON log output
//! - `RUST_LOG`-style filtering through `EnvFilter`
//! - Span helpers for retrieval, model calls and ingestion
//!
//! ## Usage
//!
//! ```rust
//! use openrag_telemetry::{init_telemetry, info, retrieval_span};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_telemetry("openrag")?;
//!
//!     let span = retrieval_span("ranked");
//!     let _enter = span.enter();
//!     info!("retrieving");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use spans::*;

pub use init::{LogFormat, init_json_telemetry, init_telemetry, init_with_format};
