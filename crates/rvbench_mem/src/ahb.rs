//! AHB-Lite memory slave with zero wait states.
//!
//! The slave serves one outstanding transfer at a time. The address phase
//! is sampled on the rising clock edge; the data phase of that transfer runs
//! on the following falling edge, so read data is on `hrdata` before the
//! master samples it at the next rising edge, when the address phase of the
//! next transfer is already being captured.
//!
//! Only `IDLE` and `NONSEQ` transfers are meaningful; `hburst`, `hprot` and
//! `hmastlock` are resolved for completeness but never read. `hready` is
//! always driven high and `hresp` always `OKAY`.

use rvbench_common::width_mask;
use rvbench_sim::{ClockEdge, EdgeTask, SignalHandle, SimError, SimTarget, SimTime};
use serde::Serialize;
use tracing::trace;

use crate::error::MemError;
use crate::image::MemoryImage;

/// `htrans` encoding of a non-sequential transfer.
pub const HTRANS_NONSEQ: u64 = 2;

/// Signal handles of one AHB-Lite slave port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AhbPortSignals {
    /// Write (1) or read (0).
    pub hwrite: SignalHandle,
    /// Transfer size code.
    pub hsize: SignalHandle,
    /// Burst type (ignored).
    pub hburst: SignalHandle,
    /// Protection control (ignored).
    pub hprot: SignalHandle,
    /// Transfer type.
    pub htrans: SignalHandle,
    /// Locked transfer (ignored).
    pub hmastlock: SignalHandle,
    /// Byte address.
    pub haddr: SignalHandle,
    /// Write data.
    pub hwdata: SignalHandle,
    /// Transfer done, driven by the slave.
    pub hready: SignalHandle,
    /// Transfer response, driven by the slave.
    pub hresp: SignalHandle,
    /// Read data, driven by the slave.
    pub hrdata: SignalHandle,
    /// Design reset.
    pub reset: SignalHandle,
    /// Whether reset is asserted low.
    pub reset_active_low: bool,
}

impl AhbPortSignals {
    /// Resolves the port's signals as `<prefix>hwrite`, `<prefix>haddr`, ...
    pub fn resolve(
        target: &dyn SimTarget,
        prefix: &str,
        reset: &str,
        reset_active_low: bool,
    ) -> Result<Self, SimError> {
        let h = |name: &str| target.resolve(&format!("{prefix}{name}"));
        Ok(Self {
            hwrite: h("hwrite")?,
            hsize: h("hsize")?,
            hburst: h("hburst")?,
            hprot: h("hprot")?,
            htrans: h("htrans")?,
            hmastlock: h("hmastlock")?,
            haddr: h("haddr")?,
            hwdata: h("hwdata")?,
            hready: h("hready")?,
            hresp: h("hresp")?,
            hrdata: h("hrdata")?,
            reset: target.resolve(reset)?,
            reset_active_low,
        })
    }
}

/// A transfer captured in the address phase, awaiting its data phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    /// Write (`true`) or read.
    pub write: bool,
    /// Byte address as driven on `haddr`.
    pub address: u64,
    /// Word address in the backing memory.
    pub word_address: u64,
    /// Transfer size code.
    pub size: u8,
    /// Byte-enable mask for the addressed lanes.
    pub mask: u64,
    /// Write data as presented on the full-width bus.
    pub data: u64,
}

/// Completed transfer counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferCounts {
    /// Reads served.
    pub reads: u64,
    /// Writes applied.
    pub writes: u64,
}

/// Derives the byte-enable mask of a transfer.
///
/// The unit is `8 << size` bits wide; its lane within the bus is
/// `(byte_address / unit_bytes) % (bus_width / unit_width)`.
pub fn byte_enable(size: u64, byte_address: u64, bus_width: u32) -> Result<u64, MemError> {
    let unsupported = MemError::UnsupportedSize { size, bus_width };
    if size > 2 {
        return Err(unsupported);
    }
    let unit_width = 8u32 << size;
    if unit_width > bus_width {
        return Err(unsupported);
    }
    let unit_bytes = u64::from(unit_width / 8);
    let lanes = u64::from(bus_width / unit_width);
    let index = (byte_address / unit_bytes) % lanes;
    Ok(width_mask(unit_width) << (index * u64::from(unit_width)))
}

/// An AHB-Lite slave serving a [`MemoryImage`] it owns.
#[derive(Debug)]
pub struct AhbLiteSlave {
    name: String,
    signals: AhbPortSignals,
    memory: MemoryImage,
    pending: Option<PendingTransaction>,
    transfers: TransferCounts,
}

impl AhbLiteSlave {
    /// Creates a slave whose bus width is the memory's data width.
    pub fn new(name: impl Into<String>, signals: AhbPortSignals, memory: MemoryImage) -> Self {
        Self {
            name: name.into(),
            signals,
            memory,
            pending: None,
            transfers: TransferCounts::default(),
        }
    }

    /// Port name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved port signals.
    pub fn signals(&self) -> &AhbPortSignals {
        &self.signals
    }

    /// The backing memory.
    pub fn memory(&self) -> &MemoryImage {
        &self.memory
    }

    /// Mutable access to the backing memory, for loading before a run.
    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        &mut self.memory
    }

    /// The transfer awaiting its data phase, if any.
    pub fn pending(&self) -> Option<&PendingTransaction> {
        self.pending.as_ref()
    }

    /// Completed transfer counts.
    pub fn transfers(&self) -> TransferCounts {
        self.transfers
    }

    /// Consumes the slave, returning its memory.
    pub fn into_memory(self) -> MemoryImage {
        self.memory
    }

    fn bus_width(&self) -> u32 {
        self.memory.data_width()
    }

    fn address_phase(&mut self, target: &mut dyn SimTarget) -> Result<(), MemError> {
        let s = self.signals;
        self.pending = None;
        target.drive_u64(s.hready, 1)?;
        target.drive_u64(s.hresp, 0)?;

        if reset_asserted(target, s.reset, s.reset_active_low)? {
            return Ok(());
        }
        // An undefined transfer type is treated as IDLE.
        if target.read_u64(s.htrans)? != Some(HTRANS_NONSEQ) {
            return Ok(());
        }

        let write = target.read_defined(s.hwrite)? != 0;
        let address = target.read_defined(s.haddr)?;
        let size = target.read_defined(s.hsize)?;
        let data = if write {
            target.read_defined(s.hwdata)?
        } else {
            0
        };
        let bus_width = self.bus_width();
        let mask = byte_enable(size, address, bus_width)?;
        let shift = (bus_width / 8).trailing_zeros();
        self.pending = Some(PendingTransaction {
            write,
            address,
            word_address: address >> shift,
            size: size as u8,
            mask,
            data: data & width_mask(bus_width),
        });
        Ok(())
    }

    fn data_phase(&mut self, target: &mut dyn SimTarget) -> Result<(), MemError> {
        let Some(txn) = self.pending.take() else {
            return Ok(());
        };
        if txn.write {
            self.memory.write(txn.word_address, txn.data, txn.mask)?;
            self.transfers.writes += 1;
            trace!(port = %self.name, addr = txn.address, data = txn.data, mask = txn.mask, "write");
        } else {
            let value = self.memory.read(txn.word_address)?;
            target.drive_u64(self.signals.hrdata, value)?;
            self.transfers.reads += 1;
            trace!(port = %self.name, addr = txn.address, value, "read");
        }
        Ok(())
    }
}

impl EdgeTask for AhbLiteSlave {
    type Error = MemError;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        _now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), MemError> {
        match edge {
            ClockEdge::Rising => self.address_phase(target),
            ClockEdge::Falling => self.data_phase(target),
        }
    }
}

/// Reads a reset signal; an undefined level counts as asserted.
pub(crate) fn reset_asserted(
    target: &dyn SimTarget,
    reset: SignalHandle,
    active_low: bool,
) -> Result<bool, SimError> {
    Ok(match target.read_u64(reset)? {
        Some(level) => (level != 0) != active_low,
        None => true,
    })
}
