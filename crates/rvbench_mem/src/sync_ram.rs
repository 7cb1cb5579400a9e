//! Single-port synchronous RAM with one cycle of latency.
//!
//! Every rising edge the port first completes the command registered on the
//! previous edge (drives read data for its address, applies its write) and
//! then registers the command currently presented. Addresses are word
//! addresses.

use rvbench_sim::{ClockEdge, EdgeTask, SignalHandle, SimError, SimTarget, SimTime};

use crate::error::MemError;
use crate::image::MemoryImage;

/// Signal handles of a synchronous RAM port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRamSignals {
    /// Word address.
    pub addr: SignalHandle,
    /// Write enable.
    pub wen: SignalHandle,
    /// Write data.
    pub wdata: SignalHandle,
    /// Read data, driven by the port.
    pub rdata: SignalHandle,
}

impl SyncRamSignals {
    /// Resolves `<prefix>addr`, `<prefix>wen`, `<prefix>wdata`, `<prefix>rdata`.
    pub fn resolve(target: &dyn SimTarget, prefix: &str) -> Result<Self, SimError> {
        let h = |name: &str| target.resolve(&format!("{prefix}{name}"));
        Ok(Self {
            addr: h("addr")?,
            wen: h("wen")?,
            wdata: h("wdata")?,
            rdata: h("rdata")?,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Registered {
    write: bool,
    addr: u64,
    data: u64,
}

/// A synchronous 1RW RAM port serving a [`MemoryImage`] it owns.
#[derive(Debug)]
pub struct SyncRamPort {
    name: String,
    signals: SyncRamSignals,
    memory: MemoryImage,
    registered: Option<Registered>,
}

impl SyncRamPort {
    /// Creates a port over `memory`.
    pub fn new(name: impl Into<String>, signals: SyncRamSignals, memory: MemoryImage) -> Self {
        Self {
            name: name.into(),
            signals,
            memory,
            registered: None,
        }
    }

    /// Port name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved port signals.
    pub fn signals(&self) -> &SyncRamSignals {
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

impl EdgeTask for SyncRamPort {
    type Error = MemError;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        _now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), MemError> {
        if edge != ClockEdge::Rising {
            return Ok(());
        }
        let s = self.signals;
        if let Some(cmd) = self.registered.take() {
            let value = self.memory.read(cmd.addr)?;
            target.drive_u64(s.rdata, value)?;
            if cmd.write {
                self.memory.write_word(cmd.addr, cmd.data)?;
            }
        }
        // Undefined address lines (e.g. during reset) register nothing.
        if let Some(addr) = target.read_u64(s.addr)? {
            let write = target.read_u64(s.wen)?.unwrap_or(0) != 0;
            let data = if write {
                target.read_defined(s.wdata)?
            } else {
                0
            };
            self.registered = Some(Registered { write, addr, data });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvbench_common::LogicVec;
    use rvbench_sim::SignalTable;

    struct Ram {
        table: SignalTable,
    }

    impl SimTarget for Ram {
        fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
            self.table.resolve(name)
        }
        fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
            self.table.width(handle)
        }
        fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError> {
            self.table.get(handle).cloned()
        }
        fn write(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError> {
            self.table.set(handle, value)
        }
        fn read_register(&self, _index: u8) -> Result<LogicVec, SimError> {
            Ok(LogicVec::new(32))
        }
        fn eval_edge(&mut self, _edge: ClockEdge) -> Result<(), SimError> {
            Ok(())
        }
    }

    fn setup() -> (Ram, SyncRamPort) {
        let mut table = SignalTable::new();
        table.add("imem_addr", 14);
        table.add("imem_wen", 1);
        table.add("imem_wdata", 32);
        table.add("imem_rdata", 32);
        let ram = Ram { table };
        let signals = SyncRamSignals::resolve(&ram, "imem_").unwrap();
        let mut mem = MemoryImage::new(14, 32).unwrap();
        mem.write_word(3, 0x0000_0013).unwrap();
        (ram, SyncRamPort::new("imem", signals, mem))
    }

    fn rise(port: &mut SyncRamPort, ram: &mut Ram) {
        port.on_edge(ClockEdge::Rising, SimTime::ZERO, ram).unwrap();
    }

    #[test]
    fn read_has_one_cycle_latency() {
        let (mut ram, mut port) = setup();
        let addr = ram.table.resolve("imem_addr").unwrap();
        let rdata = ram.table.resolve("imem_rdata").unwrap();
        ram.table.set_u64(addr, 3).unwrap();
        rise(&mut port, &mut ram);
        assert_eq!(ram.table.get_u64(rdata), Some(0));
        ram.table.set_u64(addr, 0).unwrap();
        rise(&mut port, &mut ram);
        assert_eq!(ram.table.get_u64(rdata), Some(0x13));
    }

    #[test]
    fn write_lands_on_next_edge() {
        let (mut ram, mut port) = setup();
        let t = &mut ram.table;
        t.set_u64(t.resolve("imem_addr").unwrap(), 7).unwrap();
        t.set_u64(t.resolve("imem_wen").unwrap(), 1).unwrap();
        t.set_u64(t.resolve("imem_wdata").unwrap(), 0xABCD).unwrap();
        rise(&mut port, &mut ram);
        assert_eq!(port.memory().read(7).unwrap(), 0);
        let t = &mut ram.table;
        t.set_u64(t.resolve("imem_wen").unwrap(), 0).unwrap();
        rise(&mut port, &mut ram);
        assert_eq!(port.memory().read(7).unwrap(), 0xABCD);
    }

    #[test]
    fn falling_edge_is_ignored() {
        let (mut ram, mut port) = setup();
        let addr = ram.table.resolve("imem_addr").unwrap();
        ram.table.set_u64(addr, 3).unwrap();
        port.on_edge(ClockEdge::Falling, SimTime::ZERO, &mut ram)
            .unwrap();
        rise(&mut port, &mut ram);
        rise(&mut port, &mut ram);
        let rdata = ram.table.resolve("imem_rdata").unwrap();
        assert_eq!(ram.table.get_u64(rdata), Some(0x13));
    }
}
