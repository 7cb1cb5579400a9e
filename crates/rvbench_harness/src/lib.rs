//! Test orchestration for RISC-V cores under simulation.
//!
//! A [`TestOrchestrator`] takes one [`TestCase`] from image load through
//! reset, clocked execution and verification against a caller-supplied
//! [`rvbench_sim::SimTarget`], and records the outcome in a [`TestReport`].
//!
//! - [`config`] — run-time settings derived from `rvbench.toml`
//! - [`topology`] — memory models wired to the design's ports
//! - [`family`] — completion/verification pairs per test family
//! - [`orchestrator`] — the per-test state machine
//! - [`suite`] — running a list of tests against fresh targets

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod family;
pub mod orchestrator;
pub mod report;
pub mod suite;
pub mod topology;

#[cfg(test)]
mod testing;

pub use config::HarnessConfig;
pub use error::HarnessError;
pub use family::TestCase;
pub use orchestrator::TestOrchestrator;
pub use report::{TestReport, TestState};
pub use suite::{run_suite, SuiteSummary};
pub use topology::{MemoryPort, MemorySystem};
