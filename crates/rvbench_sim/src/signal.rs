//! Named signal handles and the narrow interface a simulated design exposes.
//!
//! The harness never walks a design hierarchy. It asks the simulation
//! collaborator for a [`SignalHandle`] by name once, at construction time,
//! and afterwards only reads and drives through that handle.

use rvbench_common::LogicVec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SimError;

/// Opaque handle for a signal of a [`SimTarget`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct SignalHandle(u32);

impl SignalHandle {
    /// Creates a handle from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A clock transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClockEdge {
    /// Low-to-high transition.
    Rising,
    /// High-to-low transition.
    Falling,
}

impl fmt::Display for ClockEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockEdge::Rising => write!(f, "posedge"),
            ClockEdge::Falling => write!(f, "negedge"),
        }
    }
}

/// The signal-access surface of a simulated design (the device under test).
///
/// Implemented by the simulation collaborator. The kernel calls
/// [`eval_edge`](SimTarget::eval_edge) after every clock transition, once all
/// harness tasks have sampled and driven their signals for that edge.
pub trait SimTarget {
    /// Resolves a signal by name.
    fn resolve(&self, name: &str) -> Result<SignalHandle, SimError>;

    /// Returns the bit width of a signal.
    fn width(&self, handle: SignalHandle) -> Result<u32, SimError>;

    /// Returns the name a handle was resolved from, for diagnostics.
    fn name(&self, handle: SignalHandle) -> String {
        format!("#{}", handle.as_raw())
    }

    /// Samples the current value of a signal.
    fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError>;

    /// Drives a value onto a signal.
    fn write(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError>;

    /// Samples architectural register `x<index>` of the core.
    fn read_register(&self, index: u8) -> Result<LogicVec, SimError>;

    /// Lets the design react to a clock transition.
    fn eval_edge(&mut self, edge: ClockEdge) -> Result<(), SimError>;

    /// Samples a signal as an integer; `None` if any bit is X or Z.
    fn read_u64(&self, handle: SignalHandle) -> Result<Option<u64>, SimError> {
        Ok(self.read(handle)?.to_u64())
    }

    /// Samples a signal that must hold a definite value.
    fn read_defined(&self, handle: SignalHandle) -> Result<u64, SimError> {
        let value = self.read(handle)?;
        value.to_u64().ok_or_else(|| SimError::Undefined {
            signal: self.name(handle),
            value: value.to_string(),
        })
    }

    /// Drives an integer onto a signal at the signal's own width.
    fn drive_u64(&mut self, handle: SignalHandle, value: u64) -> Result<(), SimError> {
        let width = self.width(handle)?;
        self.write(handle, LogicVec::from_u64(value, width))
    }
}

/// A flat table of named signals.
///
/// Serves as the signal store of in-process target models: a design model
/// owns a table, exposes it through [`SimTarget`], and reads back whatever
/// the harness drove.
#[derive(Debug, Clone, Default)]
pub struct SignalTable {
    names: Vec<String>,
    values: Vec<LogicVec>,
}

impl SignalTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal initialised to zero and returns its handle.
    ///
    /// Adding an existing name returns the existing handle.
    pub fn add(&mut self, name: &str, width: u32) -> SignalHandle {
        if let Some(handle) = self.find(name) {
            return handle;
        }
        self.names.push(name.to_string());
        self.values.push(LogicVec::new(width));
        SignalHandle::from_raw((self.names.len() - 1) as u32)
    }

    /// Finds a signal by name.
    pub fn find(&self, name: &str) -> Option<SignalHandle> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| SignalHandle::from_raw(i as u32))
    }

    /// Resolves a name, failing with [`SimError::UnknownSignal`].
    pub fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
        self.find(name).ok_or_else(|| SimError::UnknownSignal {
            name: name.to_string(),
        })
    }

    /// Returns the name of a signal.
    pub fn name(&self, handle: SignalHandle) -> Result<&str, SimError> {
        self.names
            .get(handle.as_raw() as usize)
            .map(String::as_str)
            .ok_or(SimError::InvalidHandle(handle.as_raw()))
    }

    /// Returns the width of a signal.
    pub fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
        self.get(handle).map(LogicVec::width)
    }

    /// Returns the current value of a signal.
    pub fn get(&self, handle: SignalHandle) -> Result<&LogicVec, SimError> {
        self.values
            .get(handle.as_raw() as usize)
            .ok_or(SimError::InvalidHandle(handle.as_raw()))
    }

    /// Replaces the value of a signal; the width must match.
    pub fn set(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError> {
        let index = handle.as_raw() as usize;
        let current = self
            .values
            .get_mut(index)
            .ok_or(SimError::InvalidHandle(handle.as_raw()))?;
        if current.width() != value.width() {
            return Err(SimError::WidthMismatch {
                signal: self.names[index].clone(),
                expected: current.width(),
                actual: value.width(),
            });
        }
        *current = value;
        Ok(())
    }

    /// Convenience accessor returning the integer value, `None` when undefined.
    pub fn get_u64(&self, handle: SignalHandle) -> Option<u64> {
        self.get(handle).ok().and_then(LogicVec::to_u64)
    }

    /// Convenience setter driving an integer at the signal's width.
    pub fn set_u64(&mut self, handle: SignalHandle, value: u64) -> Result<(), SimError> {
        let width = self.width(handle)?;
        self.set(handle, LogicVec::from_u64(value, width))
    }

    /// Number of signals.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the table has no signals.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
