//! A passive board model for unit tests: every port signal exists, the bus
//! stays idle, and registers change on a fixed schedule.

use rvbench_common::LogicVec;
use rvbench_sim::{ClockEdge, SignalHandle, SignalTable, SimError, SimTarget};

const AHB: [(&str, u32); 11] = [
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

pub struct Board {
    table: SignalTable,
    regs: [Option<u64>; 32],
    schedule: Vec<(u64, u8, Option<u64>)>,
    cycles: u64,
}

impl Board {
    pub fn new() -> Self {
        Self::without("")
    }

    /// A board lacking the named signal.
    pub fn without(missing: &str) -> Self {
        let mut table = SignalTable::new();
        let mut add = |name: String, width: u32| {
            if name != missing {
                let h = table.add(&name, width);
                let idle = u64::from(name.ends_with("_n"));
                let _ = table.set_u64(h, idle);
            }
        };
        add("clk".into(), 1);
        add("rst".into(), 1);
        for prefix in ["ibus_", "dbus_"] {
            for (name, width) in AHB {
                add(format!("{prefix}{name}"), width);
            }
        }
        for (name, width) in [("addr", 32), ("wen", 1), ("wdata", 32), ("rdata", 32)] {
            add(format!("imem_{name}"), width);
        }
        for (name, width) in [("addr", 16), ("dq_out", 16), ("dq_in", 16)] {
            add(format!("sram_{name}"), width);
        }
        for name in ["ce_n", "we_n", "oe_n", "ub_n", "lb_n"] {
            add(format!("sram_{name}"), 1);
        }
        Self {
            table,
            regs: [Some(0); 32],
            schedule: Vec::new(),
            cycles: 0,
        }
    }

    /// Sets `x<index>` once `cycle` clock cycles have run out of reset.
    pub fn at(mut self, cycle: u64, index: u8, value: Option<u64>) -> Self {
        self.schedule.push((cycle, index, value));
        self
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn in_reset(&self) -> bool {
        self.table
            .find("rst")
            .and_then(|h| self.table.get_u64(h))
            .is_none_or(|level| level != 0)
    }
}

impl SimTarget for Board {
    fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
        self.table.resolve(name)
    }
    fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
        self.table.width(handle)
    }
    fn name(&self, handle: SignalHandle) -> String {
        self.table
            .name(handle)
            .map(str::to_string)
            .unwrap_or_else(|_| format!("#{}", handle.as_raw()))
    }
    fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError> {
        self.table.get(handle).cloned()
    }
    fn write(&mut self, handle: SignalHandle, value: LogicVec) -> Result<(), SimError> {
        self.table.set(handle, value)
    }
    fn read_register(&self, index: u8) -> Result<LogicVec, SimError> {
        Ok(match self.regs[index as usize] {
            Some(v) => LogicVec::from_u64(v, 32),
            None => LogicVec::all_x(32),
        })
    }
    fn eval_edge(&mut self, edge: ClockEdge) -> Result<(), SimError> {
        if edge != ClockEdge::Rising || self.in_reset() {
            return Ok(());
        }
        self.cycles += 1;
        for &(cycle, index, value) in &self.schedule {
            if cycle == self.cycles {
                self.regs[index as usize] = value;
            }
        }
        Ok(())
    }
}
