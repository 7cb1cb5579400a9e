//! Shared foundational types used across the rvbench verification harness.
//!
//! This crate provides the 4-state logic values observed on simulated signals,
//! packed logic vectors, and the bit-width helpers used to validate memory
//! words and bus values.

#![warn(missing_docs)]

pub mod logic;
pub mod logic_vec;
pub mod width;

pub use logic::Logic;
pub use logic_vec::LogicVec;
pub use width::{fits_width, width_mask};
