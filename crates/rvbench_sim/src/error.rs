//! Error types for signal access and virtual-clock scheduling.

use std::io;

/// Errors raised while driving or observing a simulation target.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No signal with the given hierarchical name exists on the target.
    #[error("unknown signal '{name}'")]
    UnknownSignal {
        /// The name that failed to resolve.
        name: String,
    },

    /// A handle did not refer to any signal of the target.
    #[error("invalid signal handle {0}")]
    InvalidHandle(u32),

    /// A driven value did not match the signal's width.
    #[error("width mismatch on '{signal}': signal is {expected} bits, value is {actual} bits")]
    WidthMismatch {
        /// Signal name.
        signal: String,
        /// Width of the signal.
        expected: u32,
        /// Width of the value that was driven.
        actual: u32,
    },

    /// A signal carried X or Z bits where a definite value was required.
    #[error("signal '{signal}' is undefined ({value})")]
    Undefined {
        /// Signal name.
        signal: String,
        /// The sampled value, rendered bit by bit.
        value: String,
    },

    /// The clock configuration is unusable.
    #[error("invalid clock: {reason}")]
    InvalidClock {
        /// Why the clock was rejected.
        reason: String,
    },

    /// A duration string could not be parsed.
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The simulation collaborator reported a failure.
    #[error("simulation target error: {reason}")]
    Target {
        /// Description supplied by the target.
        reason: String,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),
}
