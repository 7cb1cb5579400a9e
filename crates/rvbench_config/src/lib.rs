//! Parsing and validation of `rvbench.toml` harness configuration files.
//!
//! This crate reads the harness configuration and produces a strongly-typed
//! [`RvbenchConfig`]: timing, memory topology, signal names, signature pointer
//! locations and the named test suites. [`resolve_test`] and [`resolve_suite`]
//! turn suite entries into concrete image/reference paths and timeouts.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_suite, resolve_test, ResolvedTest};
pub use types::*;
