//! Memory topologies: which simulated memories sit on which design ports.

use std::path::Path;

use rvbench_config::{InstructionPort, Topology};
use rvbench_mem::{
    AhbLiteSlave, AhbPortSignals, LoadSummary, MemError, MemoryImage, SramPort, SramSignals,
    SyncRamPort, SyncRamSignals,
};
use rvbench_sim::{ClockEdge, EdgeTask, SignalHandle, SimTarget, SimTime};
use tracing::debug;

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// One simulated memory attached to a design port.
#[derive(Debug)]
pub enum MemoryPort {
    /// AHB-Lite slave.
    Ahb(AhbLiteSlave),
    /// Synchronous RAM.
    SyncRam(SyncRamPort),
    /// External asynchronous SRAM.
    Sram(SramPort),
}

impl MemoryPort {
    /// Port name.
    pub fn name(&self) -> &str {
        match self {
            Self::Ahb(p) => p.name(),
            Self::SyncRam(p) => p.name(),
            Self::Sram(p) => p.name(),
        }
    }

    /// The backing memory.
    pub fn memory(&self) -> &MemoryImage {
        match self {
            Self::Ahb(p) => p.memory(),
            Self::SyncRam(p) => p.memory(),
            Self::Sram(p) => p.memory(),
        }
    }

    /// Mutable access to the backing memory.
    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        match self {
            Self::Ahb(p) => p.memory_mut(),
            Self::SyncRam(p) => p.memory_mut(),
            Self::Sram(p) => p.memory_mut(),
        }
    }

    /// Signals worth recording in a waveform.
    pub fn traced_signals(&self) -> Vec<SignalHandle> {
        match self {
            Self::Ahb(p) => {
                let s = p.signals();
                vec![s.htrans, s.hwrite, s.hsize, s.haddr, s.hwdata, s.hrdata]
            }
            Self::SyncRam(p) => {
                let s = p.signals();
                vec![s.addr, s.wen, s.wdata, s.rdata]
            }
            Self::Sram(p) => {
                let s = p.signals();
                vec![s.addr, s.dq_out, s.dq_in, s.ce_n, s.we_n, s.oe_n, s.ub_n, s.lb_n]
            }
        }
    }
}

impl EdgeTask for MemoryPort {
    type Error = MemError;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), MemError> {
        match self {
            Self::Ahb(p) => p.on_edge(edge, now, target),
            Self::SyncRam(p) => p.on_edge(edge, now, target),
            Self::Sram(p) => p.on_edge(edge, now, target),
        }
    }
}

/// The set of memories of one test, built from the configured topology.
///
/// Every memory holds the program image. The data memory is the one
/// signature pointers and probes read.
#[derive(Debug)]
pub struct MemorySystem {
    ports: Vec<MemoryPort>,
    data_port: usize,
    word_size: usize,
}

impl MemorySystem {
    /// Resolves the port signals on `target` and creates empty memories.
    pub fn build(target: &dyn SimTarget, config: &HarnessConfig) -> Result<Self, HarnessError> {
        let names = &config.signals;
        let memory = &config.memory;
        let rst = names.rst.as_str();
        let low = names.rst_active_low;
        let ahb = |prefix: &str, name: &str| -> Result<MemoryPort, HarnessError> {
            let signals = AhbPortSignals::resolve(target, prefix, rst, low)?;
            let image = MemoryImage::new(memory.addr_width, 32)?;
            Ok(MemoryPort::Ahb(AhbLiteSlave::new(name, signals, image)))
        };

        let (ports, data_port) = match memory.topology {
            Topology::Unified => (vec![ahb(&names.dbus, "dbus")?], 0),
            Topology::Split => {
                let instruction = match memory.instruction_port {
                    InstructionPort::Ahb => ahb(&names.ibus, "ibus")?,
                    InstructionPort::Sync => {
                        let signals = SyncRamSignals::resolve(target, &names.imem)?;
                        let image = MemoryImage::new(memory.addr_width, 32)?;
                        MemoryPort::SyncRam(SyncRamPort::new("imem", signals, image))
                    }
                };
                (vec![instruction, ahb(&names.dbus, "dbus")?], 1)
            }
            Topology::Sram => {
                let signals = SramSignals::resolve(target, &names.sram)?;
                let image = MemoryImage::new(memory.addr_width, 16)?;
                (vec![MemoryPort::Sram(SramPort::new("sram", signals, image)?)], 0)
            }
        };
        debug!(
            topology = ?memory.topology,
            ports = ?ports.iter().map(MemoryPort::name).collect::<Vec<_>>(),
            "memory topology built"
        );
        Ok(Self {
            ports,
            data_port,
            word_size: memory.word_bytes(),
        })
    }

    /// Clears `clear_words` words of every memory, then loads the image
    /// into each of them.
    pub fn load(&mut self, image: &Path, clear_words: u64) -> Result<LoadSummary, MemError> {
        let mut summary = LoadSummary::default();
        for port in &mut self.ports {
            let memory = port.memory_mut();
            memory.clear(clear_words);
            summary = memory.load(image, self.word_size)?;
        }
        Ok(summary)
    }

    /// The memory data accesses land in.
    pub fn data_memory(&self) -> &MemoryImage {
        self.ports[self.data_port].memory()
    }

    /// All ports, instruction side first.
    pub fn ports(&self) -> &[MemoryPort] {
        &self.ports
    }

    /// Image-loader word size in bytes.
    pub fn word_size(&self) -> usize {
        self.word_size
    }

    /// Signals of every port worth recording in a waveform.
    pub fn traced_signals(&self) -> Vec<SignalHandle> {
        self.ports.iter().flat_map(MemoryPort::traced_signals).collect()
    }
}

impl EdgeTask for MemorySystem {
    type Error = MemError;

    fn on_edge(
        &mut self,
        edge: ClockEdge,
        now: SimTime,
        target: &mut dyn SimTarget,
    ) -> Result<(), MemError> {
        self.ports.on_edge(edge, now, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Board;
    use rvbench_config::MemorySettings;
    use std::fs;

    fn config(topology: Topology, instruction_port: InstructionPort) -> HarnessConfig {
        HarnessConfig {
            memory: MemorySettings {
                topology,
                instruction_port,
                ..MemorySettings::default()
            },
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn unified_has_one_data_port() {
        let board = Board::new();
        let system =
            MemorySystem::build(&board, &config(Topology::Unified, InstructionPort::Ahb)).unwrap();
        assert_eq!(system.ports().len(), 1);
        assert_eq!(system.ports()[0].name(), "dbus");
        assert_eq!(system.data_memory().data_width(), 32);
        assert_eq!(system.word_size(), 4);
    }

    #[test]
    fn split_loads_both_memories() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("prog.verilog");
        fs::write(&image, "@00000000\n13 05 10 00\n").unwrap();

        let board = Board::new();
        let mut system =
            MemorySystem::build(&board, &config(Topology::Split, InstructionPort::Ahb)).unwrap();
        system.load(&image, 8192).unwrap();
        let names: Vec<_> = system.ports().iter().map(MemoryPort::name).collect();
        assert_eq!(names, vec!["ibus", "dbus"]);
        for port in system.ports() {
            assert_eq!(port.memory().read(0).unwrap(), 0x0010_0513);
        }
    }

    #[test]
    fn split_with_sync_instruction_ram() {
        let board = Board::new();
        let system =
            MemorySystem::build(&board, &config(Topology::Split, InstructionPort::Sync)).unwrap();
        assert!(matches!(system.ports()[0], MemoryPort::SyncRam(_)));
        assert_eq!(system.ports()[1].name(), "dbus");
        assert_eq!(system.traced_signals().len(), 4 + 6);
    }

    #[test]
    fn sram_uses_half_words() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("prog.verilog");
        fs::write(&image, "@00000000\n13 05 10 00\n").unwrap();

        let board = Board::new();
        let mut system =
            MemorySystem::build(&board, &config(Topology::Sram, InstructionPort::Ahb)).unwrap();
        assert_eq!(system.word_size(), 2);
        let summary = system.load(&image, 8192).unwrap();
        assert_eq!(summary.words, 2);
        assert_eq!(system.data_memory().read(0).unwrap(), 0x0513);
        assert_eq!(system.data_memory().read(1).unwrap(), 0x0010);
    }

    #[test]
    fn missing_port_signal() {
        let board = Board::without("dbus_hwdata");
        let err = MemorySystem::build(&board, &config(Topology::Unified, InstructionPort::Ahb))
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown signal 'dbus_hwdata'");
    }
}
