//! Virtual-clock scheduling layer for the rvbench harness.
//!
//! The harness does not simulate hardware. A simulation collaborator exposes
//! a design through the narrow [`SimTarget`] trait (named signal handles,
//! register reads, edge evaluation); this crate supplies the clock that drives
//! it and the cooperative scheduling of harness tasks around each edge.
//!
//! # Modules
//!
//! - `error` — Signal-access and scheduling errors
//! - `time` — Femtosecond-precision virtual time and duration parsing
//! - `signal` — Signal handles, the `SimTarget` trait, an in-memory signal table
//! - `kernel` — Clock generation, timed events, and `EdgeTask` resumption
//! - `waveform` — VCD recording of traced signals

#![warn(missing_docs)]

pub mod error;
pub mod kernel;
pub mod signal;
pub mod time;
pub mod waveform;

pub use error::SimError;
pub use kernel::{EdgeTask, SimKernel};
pub use signal::{ClockEdge, SignalHandle, SignalTable, SimTarget};
pub use time::SimTime;
pub use waveform::{VcdRecorder, WaveformRecorder};
