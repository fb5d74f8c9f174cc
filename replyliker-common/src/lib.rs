//! Utilities shared across the replyliker crates.
//!
//! Right now this is only the [`observability`] module, which owns the global
//! `tracing` setup for the binary and for integration tests.
//!
//! ```rust
//! use replyliker_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: "json".parse().unwrap(),
//!     ..LogConfig::default()
//! };
//! assert!(matches!(cfg.format, LogFormat::Json));
//! assert!(!cfg.emit_stderr);
//! ```
pub mod observability;
