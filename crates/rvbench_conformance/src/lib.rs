//! Conformance helpers for the rvbench harness.
//!
//! Provides [`ScriptedCore`], an in-process stand-in for a RISC-V core under
//! simulation. It exposes the same named signals a real design would, acts as
//! a bus master on its data port (AHB-Lite or external SRAM), optionally
//! fetches from an instruction port, and executes a fixed script of loads,
//! stores and register writes instead of real instructions. Integration
//! tests drive it through the full orchestrator.

#![warn(missing_docs)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use rvbench_common::{width_mask, LogicVec};
use rvbench_sim::{ClockEdge, SignalHandle, SignalTable, SimError, SimTarget};

const AHB_SIGNALS: [(&str, u32); 11] = [
    ("hwrite", 1),
    ("hsize", 3),
    ("hburst", 3),
    ("hprot", 4),
    ("htrans", 2),
    ("hmastlock", 1),
    ("haddr", 32),
    ("hwdata", 32),
    ("hready", 1),
    ("hresp", 1),
    ("hrdata", 32),
];

const HTRANS_IDLE: u64 = 0;
const HTRANS_NONSEQ: u64 = 2;

/// One scripted core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Stores the low `1 << size` bytes of `value` at byte address `addr`.
    Store {
        /// Byte address.
        addr: u64,
        /// Size code: 0 byte, 1 halfword, 2 word.
        size: u8,
        /// Value, right-aligned.
        value: u64,
    },
    /// Loads `1 << size` bytes from `addr` into `x<rd>`, zero-extended.
    Load {
        /// Byte address.
        addr: u64,
        /// Size code.
        size: u8,
        /// Destination register.
        rd: u8,
    },
    /// Writes `value` to `x<rd>` without touching the bus.
    Set {
        /// Destination register.
        rd: u8,
        /// Value.
        value: u64,
    },
    /// Leaves the bus idle for the given number of cycles.
    Wait(u32),
}

/// Which interface the core's data accesses use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBus {
    /// AHB-Lite master on the `dbus_` port.
    Ahb,
    /// 16-bit asynchronous SRAM controller on the `sram_` port.
    Sram,
}

/// Which instruction port the core fetches from, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// No instruction fetches.
    None,
    /// AHB-Lite reads on the `ibus_` port.
    Ahb,
    /// Synchronous RAM reads on the `imem_` port.
    Sync,
}

/// Where a bus read's result goes.
#[derive(Debug, Clone, Copy)]
struct Capture {
    rd: u8,
    /// Byte offset of the value within the data bus.
    lane: u32,
    /// Bits to take.
    width: u32,
    /// Bit position within the destination register.
    shift: u32,
}

/// One cycle of core activity.
#[derive(Debug, Clone, Copy)]
enum Step {
    Write { addr: u64, size: u8, value: u64 },
    Read { addr: u64, size: u8, capture: Capture },
    Set { rd: u8, value: u64 },
    Idle,
}

/// An in-process core model that runs a fixed script.
pub struct ScriptedCore {
    table: SignalTable,
    data_bus: DataBus,
    fetch: Fetch,
    regs: [Option<u64>; 32],
    steps: VecDeque<Step>,
    /// Read issued this cycle; its address phase is on the next edge.
    issued: Option<Capture>,
    /// Read whose data arrives by the next edge.
    addressed: Option<Capture>,
    pc: u64,
    fetch_limit: usize,
    fetch_issued: bool,
    fetch_addressed: bool,
    fetched: Vec<u64>,
    cycles: u64,
}

impl ScriptedCore {
    /// Creates a core that issues data accesses on `data_bus` and fetches
    /// from `fetch`.
    pub fn new(data_bus: DataBus, fetch: Fetch, script: &[Op]) -> Self {
        let mut table = SignalTable::new();
        let mut names = vec![("clk".to_string(), 1), ("rst".to_string(), 1)];
        for prefix in ["ibus_", "dbus_"] {
            names.extend(AHB_SIGNALS.iter().map(|&(n, w)| (format!("{prefix}{n}"), w)));
        }
        for (name, width) in [("addr", 32), ("wen", 1), ("wdata", 32), ("rdata", 32)] {
            names.push((format!("imem_{name}"), width));
        }
        for (name, width) in [("addr", 16), ("dq_out", 16), ("dq_in", 16)] {
            names.push((format!("sram_{name}"), width));
        }
        for name in ["ce_n", "we_n", "oe_n", "ub_n", "lb_n"] {
            names.push((format!("sram_{name}"), 1));
        }
        for (name, width) in names {
            let handle = table.add(&name, width);
            // Active-low strobes idle high; everything else starts at zero.
            let _ = table.set_u64(handle, u64::from(name.ends_with("_n")));
        }
        let mut core = Self {
            table,
            data_bus,
            fetch,
            regs: [None; 32],
            steps: VecDeque::new(),
            issued: None,
            addressed: None,
            pc: 0,
            fetch_limit: 0,
            fetch_issued: false,
            fetch_addressed: false,
            fetched: Vec::new(),
            cycles: 0,
        };
        core.regs[0] = Some(0);
        for op in script {
            core.lower(*op);
        }
        core
    }

    /// A unified-memory core with an AHB-Lite data port.
    pub fn unified(script: &[Op]) -> Self {
        Self::new(DataBus::Ahb, Fetch::None, script)
    }

    /// Fetches `words` consecutive instruction words from address zero.
    pub fn fetching(mut self, words: usize) -> Self {
        self.fetch_limit = words;
        self
    }

    /// Instruction words fetched so far, in order.
    pub fn fetched(&self) -> &[u64] {
        &self.fetched
    }

    /// Rising edges seen out of reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Whether every scripted operation has been issued.
    pub fn script_done(&self) -> bool {
        self.steps.is_empty()
    }

    /// Current value of `x<index>`.
    pub fn register(&self, index: u8) -> Option<u64> {
        self.regs[index as usize]
    }

    fn lower(&mut self, op: Op) {
        match (op, self.data_bus) {
            (Op::Set { rd, value }, _) => self.steps.push_back(Step::Set { rd, value }),
            (Op::Wait(n), _) => {
                self.steps.extend(std::iter::repeat(Step::Idle).take(n as usize));
            }
            (Op::Store { addr, size, value }, DataBus::Ahb) => {
                self.steps.push_back(Step::Write { addr, size, value })
            }
            (Op::Load { addr, size, rd }, DataBus::Ahb) => self.steps.push_back(Step::Read {
                addr,
                size,
                capture: Capture {
                    rd,
                    lane: (addr % 4) as u32,
                    width: 8 << size,
                    shift: 0,
                },
            }),
            // The SRAM is 16 bits wide: words take two halfword cycles.
            (Op::Store { addr, size, value }, DataBus::Sram) => {
                if size < 2 {
                    self.steps.push_back(Step::Write { addr, size, value });
                } else {
                    self.steps.push_back(Step::Write {
                        addr,
                        size: 1,
                        value: value & 0xFFFF,
                    });
                    self.steps.push_back(Step::Write {
                        addr: addr + 2,
                        size: 1,
                        value: (value >> 16) & 0xFFFF,
                    });
                }
            }
            (Op::Load { addr, size, rd }, DataBus::Sram) => {
                let halves = if size < 2 { 1 } else { 2 };
                for half in 0..halves {
                    let at = addr + 2 * half;
                    self.steps.push_back(Step::Read {
                        addr: at,
                        size: size.min(1),
                        capture: Capture {
                            rd,
                            lane: (at % 2) as u32,
                            width: 8 << size.min(1),
                            shift: 16 * half as u32,
                        },
                    });
                }
            }
        }
    }

    fn h(&self, name: &str) -> Result<SignalHandle, SimError> {
        self.table.resolve(name)
    }

    fn set(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let handle = self.h(name)?;
        self.table.set_u64(handle, value)
    }

    fn get(&self, name: &str) -> Result<Option<u64>, SimError> {
        Ok(self.table.get_u64(self.h(name)?))
    }

    fn in_reset(&self) -> Result<bool, SimError> {
        Ok(self.get("rst")? != Some(0))
    }

    fn capture(&mut self, capture: Capture, bus: u64) {
        if capture.rd == 0 {
            return;
        }
        let value = (bus >> (8 * capture.lane)) & width_mask(capture.width);
        let reg = &mut self.regs[capture.rd as usize];
        // Upper halves of a split load merge into the lower half already captured.
        let low = if capture.shift == 0 { 0 } else { reg.unwrap_or(0) };
        *reg = Some(low | (value << capture.shift));
    }

    fn drive_idle(&mut self) -> Result<(), SimError> {
        match self.data_bus {
            DataBus::Ahb => self.set("dbus_htrans", HTRANS_IDLE),
            DataBus::Sram => {
                for name in ["sram_ce_n", "sram_we_n", "sram_oe_n", "sram_ub_n", "sram_lb_n"] {
                    self.set(name, 1)?;
                }
                Ok(())
            }
        }
    }

    fn drive_ahb(&mut self, write: bool, addr: u64, size: u8, value: u64) -> Result<(), SimError> {
        self.set("dbus_htrans", HTRANS_NONSEQ)?;
        self.set("dbus_hwrite", u64::from(write))?;
        self.set("dbus_hsize", u64::from(size))?;
        self.set("dbus_haddr", addr)?;
        if write {
            let lane = 8 * (addr % 4);
            self.set("dbus_hwdata", (value << lane) & 0xFFFF_FFFF)?;
        }
        Ok(())
    }

    fn drive_sram(&mut self, write: bool, addr: u64, size: u8, value: u64) -> Result<(), SimError> {
        let (lb, ub) = match (size, addr % 2) {
            (0, 0) => (0, 1),
            (0, _) => (1, 0),
            _ => (0, 0),
        };
        self.set("sram_addr", addr >> 1)?;
        self.set("sram_ce_n", 0)?;
        self.set("sram_we_n", u64::from(!write))?;
        self.set("sram_oe_n", u64::from(write))?;
        self.set("sram_lb_n", lb)?;
        self.set("sram_ub_n", ub)?;
        if write {
            self.set("sram_dq_out", (value << (8 * (addr % 2))) & 0xFFFF)?;
        }
        Ok(())
    }

    /// Data side of one rising edge.
    fn data_cycle(&mut self) -> Result<(), SimError> {
        let (latency_two, data_in) = match self.data_bus {
            DataBus::Ahb => (true, "dbus_hrdata"),
            DataBus::Sram => (false, "sram_dq_in"),
        };
        let ready = if latency_two {
            std::mem::replace(&mut self.addressed, self.issued.take())
        } else {
            self.issued.take()
        };
        if let Some(capture) = ready {
            let bus = self.get(data_in)?.unwrap_or(0);
            self.capture(capture, bus);
        }

        match self.steps.pop_front().unwrap_or(Step::Idle) {
            Step::Idle => self.drive_idle(),
            Step::Set { rd, value } => {
                if rd != 0 {
                    self.regs[rd as usize] = Some(value);
                }
                self.drive_idle()
            }
            Step::Write { addr, size, value } => match self.data_bus {
                DataBus::Ahb => self.drive_ahb(true, addr, size, value),
                DataBus::Sram => self.drive_sram(true, addr, size, value),
            },
            Step::Read { addr, size, capture } => {
                self.issued = Some(capture);
                match self.data_bus {
                    DataBus::Ahb => self.drive_ahb(false, addr, size, 0),
                    DataBus::Sram => self.drive_sram(false, addr, size, 0),
                }
            }
        }
    }

    /// Instruction side of one rising edge.
    fn fetch_cycle(&mut self) -> Result<(), SimError> {
        let data_in = match self.fetch {
            Fetch::None => return Ok(()),
            Fetch::Ahb => "ibus_hrdata",
            Fetch::Sync => "imem_rdata",
        };
        if std::mem::replace(&mut self.fetch_addressed, self.fetch_issued) {
            let word = self.get(data_in)?.unwrap_or(0);
            self.fetched.push(word);
        }
        self.fetch_issued = false;
        let requested = self.fetched.len() + usize::from(self.fetch_addressed);
        if requested >= self.fetch_limit {
            if self.fetch == Fetch::Ahb {
                self.set("ibus_htrans", HTRANS_IDLE)?;
            }
            return Ok(());
        }
        match self.fetch {
            Fetch::Ahb => {
                self.set("ibus_htrans", HTRANS_NONSEQ)?;
                self.set("ibus_hwrite", 0)?;
                self.set("ibus_hsize", 2)?;
                self.set("ibus_haddr", self.pc)?;
            }
            Fetch::Sync => {
                self.set("imem_wen", 0)?;
                self.set("imem_addr", self.pc >> 2)?;
            }
            Fetch::None => {}
        }
        self.fetch_issued = true;
        self.pc += 4;
        Ok(())
    }

    fn reset_state(&mut self) -> Result<(), SimError> {
        self.issued = None;
        self.addressed = None;
        self.fetch_issued = false;
        self.fetch_addressed = false;
        self.set("ibus_htrans", HTRANS_IDLE)?;
        self.drive_idle()
    }
}

impl SimTarget for ScriptedCore {
    fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
        self.table.resolve(name)
    }

    fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
        self.table.width(handle)
    }

    fn name(&self, handle: SignalHandle) -> String {
        self.table
            .name(handle)
            .map_or_else(|_| format!("#{}", handle.as_raw()), str::to_string)
    }

    fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError> {
        self.table.get(handle).cloned()
    }

    fn write(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError> {
        self.table.set(handle, value)
    }

    fn read_register(&self, index: u8) -> Result<LogicVec, SimError> {
        let value = self
            .regs
            .get(index as usize)
            .ok_or_else(|| SimError::Target {
                reason: format!("no register x{index}"),
            })?;
        Ok(match value {
            Some(v) => LogicVec::from_u64(*v, 32),
            None => LogicVec::all_x(32),
        })
    }

    fn eval_edge(&mut self, edge: ClockEdge) -> Result<(), SimError> {
        if edge != ClockEdge::Rising {
            return Ok(());
        }
        if self.in_reset()? {
            return self.reset_state();
        }
        self.cycles += 1;
        self.fetch_cycle()?;
        self.data_cycle()
    }
}

/// Script helpers for common completion conventions.
pub mod script {
    use super::Op;

    /// Stores a word.
    pub fn sw(addr: u64, value: u64) -> Op {
        Op::Store {
            addr,
            size: 2,
            value,
        }
    }

    /// Loads a word.
    pub fn lw(rd: u8, addr: u64) -> Op {
        Op::Load { addr, size: 2, rd }
    }

    /// Publishes signature bounds through the default pointer words.
    pub fn publish_signature(begin: u64, end: u64) -> Vec<Op> {
        vec![sw(0x3FF0, begin), sw(0x3FF4, end)]
    }

    /// Writes the register-pattern pass marker.
    pub fn pass() -> Vec<Op> {
        vec![
            Op::Set { rd: 1, value: 1 },
            Op::Set { rd: 2, value: 2 },
            Op::Set { rd: 3, value: 3 },
        ]
    }

    /// Writes the register-pattern fail marker.
    pub fn fail() -> Vec<Op> {
        (1..=3).map(|rd| Op::Set { rd, value: 0xF }).collect()
    }
}

/// Writes an addressed hex dump of little-endian 32-bit `words` starting at
/// byte address `base` into `dir/name`, returning the path.
pub fn write_image(dir: &Path, name: &str, base: u64, words: &[u32]) -> PathBuf {
    let mut text = format!("@{base:08x}\n");
    for word in words {
        let bytes = word.to_le_bytes();
        text.push_str(&format!(
            "{:02x} {:02x} {:02x} {:02x}\n",
            bytes[0], bytes[1], bytes[2], bytes[3]
        ));
    }
    let path = dir.join(name);
    // Test fixture helper; a failed write surfaces as a load error.
    let _ = fs::write(&path, text);
    path
}
