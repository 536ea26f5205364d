//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config / auth / capabilities
//!     → tracing events (proxy resolution, per-request debug, probe failures)
//!     → logging.rs subscriber (installed by the binary only)
//!     → stderr
//! ```
//!
//! # Design Decisions
//! - The library emits events but never installs a subscriber
//! - Filter comes from `RUST_LOG`, falling back to a caller-supplied default
//! - API tokens are never recorded in any event

pub mod logging;
