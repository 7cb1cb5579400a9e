//! Error type aggregating every failure a test run can hit.

use rvbench_config::ConfigError;
use rvbench_mem::MemError;
use rvbench_sim::{SimError, SimTime};
use rvbench_verify::VerifyError;

/// Errors raised while setting up, running or verifying a test.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// No completion was observed within the time limit.
    #[error("timed out after {elapsed} (limit {limit}){}", last_seen(.observation))]
    Timeout {
        /// The configured limit.
        limit: SimTime,
        /// Virtual time elapsed since reset release.
        elapsed: SimTime,
        /// What the completion strategy last observed.
        observation: Option<String>,
    },

    /// The design does not expose what the harness needs.
    #[error("design setup: {0}")]
    Setup(String),

    /// Loading or accessing memory failed.
    #[error(transparent)]
    Mem(#[from] MemError),

    /// Driving or observing the design failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Completion detection or verification failed.
    #[error(transparent)]
    Verify(#[from] VerifyError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Writing a run artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn last_seen(observation: &Option<String>) -> String {
    match observation {
        Some(o) => format!("; last observed {o}"),
        None => String::new(),
    }
}
