//! Completion detection.
//!
//! A [`CompletionStrategy`] is polled by the orchestrator after every
//! virtual-time increment and decides whether the program under test has
//! finished.

use rvbench_sim::SimTime;
use serde::Serialize;

use crate::error::VerifyError;
use crate::probe::Probe;
use crate::signature::{SignaturePointers, SignatureRegion};

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Whether the program has finished.
    pub completed: bool,
    /// Pass indication carried by the completion marker, if it has one.
    pub passed: Option<bool>,
}

impl Completion {
    /// Not yet finished.
    pub const PENDING: Completion = Completion {
        completed: false,
        passed: None,
    };

    /// Finished, with an optional pass indication.
    pub fn done(passed: Option<bool>) -> Self {
        Self {
            completed: true,
            passed,
        }
    }
}

/// Completion signalled through three result registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPattern {
    /// Registers holding the pattern.
    pub registers: [u8; 3],
    /// Values meaning "passed".
    pub pass: [u64; 3],
    /// Values meaning "failed".
    pub fail: [u64; 3],
    last: Option<[u64; 3]>,
}

impl Default for RegisterPattern {
    fn default() -> Self {
        Self {
            registers: [1, 2, 3],
            pass: [1, 2, 3],
            fail: [0xF, 0xF, 0xF],
            last: None,
        }
    }
}

impl RegisterPattern {
    fn poll(&mut self, probe: &Probe<'_>) -> Result<Completion, VerifyError> {
        let mut values = [0u64; 3];
        for (slot, &index) in values.iter_mut().zip(&self.registers) {
            // Registers are routinely undefined until the program writes
            // them, so an undefined value only means "not yet".
            match probe.register(index)? {
                Some(v) => *slot = v,
                None => return Ok(Completion::PENDING),
            }
        }
        self.last = Some(values);
        if values == self.pass {
            Ok(Completion::done(Some(true)))
        } else if values == self.fail {
            Err(VerifyError::FailPattern {
                registers: self.registers,
                values,
            })
        } else {
            Ok(Completion::PENDING)
        }
    }
}

/// Completion signalled by publishing valid signature pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureWatch {
    /// Pointer locations.
    pub pointers: SignaturePointers,
    last: Option<SignatureRegion>,
}

impl SignatureWatch {
    /// Watches the given pointer locations.
    pub fn new(pointers: SignaturePointers) -> Self {
        Self {
            pointers,
            last: None,
        }
    }

    fn poll(&mut self, probe: &Probe<'_>) -> Result<Completion, VerifyError> {
        let region = self.pointers.read(probe.memory()?)?;
        self.last = Some(region);
        Ok(if region.is_valid() {
            Completion::done(None)
        } else {
            Completion::PENDING
        })
    }
}

/// Completion after a fixed amount of virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedQuiescence {
    /// Time to run before proceeding.
    pub duration: SimTime,
}

/// How a test decides that it has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionStrategy {
    /// Three registers equal the pass pattern (or the fatal fail pattern).
    RegisterPattern(RegisterPattern),
    /// The signature pointers delimit a region.
    SignatureRegion(SignatureWatch),
    /// A fixed run time has elapsed.
    FixedQuiescence(FixedQuiescence),
}

impl CompletionStrategy {
    /// The default register pattern: x1..x3 = (1, 2, 3) passes, all 0xF fails.
    pub fn register_pattern() -> Self {
        Self::RegisterPattern(RegisterPattern::default())
    }

    /// Watches signature pointers at the given locations.
    pub fn signature_region(pointers: SignaturePointers) -> Self {
        Self::SignatureRegion(SignatureWatch::new(pointers))
    }

    /// Completes once `duration` has elapsed.
    pub fn fixed(duration: SimTime) -> Self {
        Self::FixedQuiescence(FixedQuiescence { duration })
    }

    /// Short name for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegisterPattern(_) => "register-pattern",
            Self::SignatureRegion(_) => "signature-region",
            Self::FixedQuiescence(_) => "fixed-quiescence",
        }
    }

    /// Polls for completion. `elapsed` is the virtual time since reset was
    /// released.
    ///
    /// A fail pattern is returned as an error: it is fatal and the test must
    /// not keep running.
    pub fn poll(&mut self, probe: &Probe<'_>, elapsed: SimTime) -> Result<Completion, VerifyError> {
        match self {
            Self::RegisterPattern(p) => p.poll(probe),
            Self::SignatureRegion(w) => w.poll(probe),
            Self::FixedQuiescence(q) => Ok(if elapsed >= q.duration {
                Completion::done(None)
            } else {
                Completion::PENDING
            }),
        }
    }

    /// What the last poll observed, for timeout diagnostics.
    pub fn last_observation(&self) -> Option<String> {
        match self {
            Self::RegisterPattern(p) => p.last.map(|v| {
                format!(
                    "x{} = {:#x}, x{} = {:#x}, x{} = {:#x}",
                    p.registers[0], v[0], p.registers[1], v[1], p.registers[2], v[2]
                )
            }),
            Self::SignatureRegion(w) => w
                .last
                .map(|r| format!("begin = {:#x}, end = {:#x}", r.begin, r.end)),
            Self::FixedQuiescence(_) => None,
        }
    }
}
