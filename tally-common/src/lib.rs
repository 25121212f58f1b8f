//! Shared plumbing for the tally workspace.
//!
//! Kept dependency-light so every crate can pull it in. Today it only hosts
//! [`observability`], the single place where the `tracing` subscriber is
//! configured for binaries and integration tests.
//!
//! ```rust
//! use tally_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::Json,
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "tally");
//! assert_eq!(cfg.default_filter, "info");
//! ```
pub mod observability;
