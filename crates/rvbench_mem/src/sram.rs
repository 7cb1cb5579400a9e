//! External asynchronous SRAM with a 16-bit data bus and byte lanes.
//!
//! Models the IS61WV-style parts found on FPGA boards: active-low chip,
//! write and output enables, plus upper/lower byte selects. The chip has no
//! clock; the port is evaluated on both clock edges, which is the finest
//! granularity at which the harness observes the design.

use rvbench_sim::{ClockEdge, EdgeTask, SignalHandle, SimError, SimTarget, SimTime};

use crate::error::MemError;
use crate::image::MemoryImage;

/// Signal handles of an asynchronous SRAM port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SramSignals {
    /// Word address.
    pub addr: SignalHandle,
    /// Data driven by the controller.
    pub dq_out: SignalHandle,
    /// Data driven by the SRAM.
    pub dq_in: SignalHandle,
    /// Chip enable, active low.
    pub ce_n: SignalHandle,
    /// Write enable, active low.
    pub we_n: SignalHandle,
    /// Output enable, active low.
    pub oe_n: SignalHandle,
    /// Upper byte select, active low.
    pub ub_n: SignalHandle,
    /// Lower byte select, active low.
    pub lb_n: SignalHandle,
}

impl SramSignals {
    /// Resolves `<prefix>addr`, `<prefix>dq_out`, `<prefix>dq_in`,
    /// `<prefix>ce_n`, `<prefix>we_n`, `<prefix>oe_n`, `<prefix>ub_n`,
    /// `<prefix>lb_n`.
    pub fn resolve(target: &dyn SimTarget, prefix: &str) -> Result<Self, SimError> {
        let h = |name: &str| target.resolve(&format!("{prefix}{name}"));
        Ok(Self {
            addr: h("addr")?,
            dq_out: h("dq_out")?,
            dq_in: h("dq_in")?,
            ce_n: h("ce_n")?,
            we_n: h("we_n")?,
            oe_n: h("oe_n")?,
            ub_n: h("ub_n")?,
            lb_n: h("lb_n")?,
        })
    }
}

/// A 16-bit external SRAM serving a [`MemoryImage`] it owns.
#[derive(Debug)]
pub struct SramPort {
    name: String,
    signals: SramSignals,
    memory: MemoryImage,
}

impl SramPort {
    /// Creates a port over a 16-bit `memory`.
    pub fn new(
        name: impl Into<String>,
        signals: SramSignals,
        memory: MemoryImage,
    ) -> Result<Self, MemError> {
        if memory.data_width() != 16 {
            return Err(MemError::InvalidWidth {
                reason: format!("SRAM data width must be 16, got {}", memory.data_width()),
            });
        }
        Ok(Self {
            name: name.into(),
            signals,
            memory,
        })
    }

    /// Port name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved port signals.
    pub fn signals(&self) -> &SramSignals {
        &self.signals
    }

    /// The backing memory.
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Mutable access to the backing memory.
    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        &mut self.memory
    }

    /// Consumes the port, returning its memory.
    pub fn into_memory(self) -> MemoryImage {
        self.memory
    }
}

/// `true` only for a defined low level.
fn low(target: &dyn SimTarget, handle: SignalHandle) -> Result<bool, SimError> {
    Ok(target.read_u64(handle)? == Some(0))
}

impl EdgeTask for SramPort {
    type Error = MemError;

    fn on_edge(
        &mut self,
        _edge: ClockEdge,
        _now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), MemError> {
        let s = self.signals;
        if !low(target, s.ce_n)? {
            return Ok(());
        }
        let addr = target.read_defined(s.addr)?;
        if low(target, s.we_n)? {
            let mut mask = 0;
            if low(target, s.lb_n)? {
                mask |= 0x00FF;
            }
            if low(target, s.ub_n)? {
                mask |= 0xFF00;
            }
            if mask != 0 {
                let data = target.read_defined(s.dq_out)?;
                self.memory.write(addr, data & 0xFFFF, mask)?;
            }
        } else if low(target, s.oe_n)? {
            let value = self.memory.read(addr)?;
            target.drive_u64(s.dq_in, value)?;
        }
        Ok(())
    }
}
