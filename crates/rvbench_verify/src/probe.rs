//! Read-only views of design state for completion checks and verifiers.

use rvbench_mem::MemoryImage;
use rvbench_sim::SimTarget;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::VerifyError;

/// What to do when a register holds X or Z bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndefinedPolicy {
    /// Fail with [`VerifyError::UndefinedRegister`].
    #[default]
    Reject,
    /// Read the register as zero and log a warning.
    Zero,
}

/// Register and data-memory access for one test.
pub struct Probe<'a> {
    target: &'a dyn SimTarget,
    data_memory: Option<&'a MemoryImage>,
    undefined: UndefinedPolicy,
}

impl<'a> Probe<'a> {
    /// Creates a probe over `target` and, when the test has one, the memory
    /// the core's data accesses land in.
    pub fn new(
        target: &'a dyn SimTarget,
        data_memory: Option<&'a MemoryImage>,
        undefined: UndefinedPolicy,
    ) -> Self {
        Self {
            target,
            data_memory,
            undefined,
        }
    }

    /// The configured undefined-register policy.
    pub fn undefined_policy(&self) -> UndefinedPolicy {
        self.undefined
    }

    /// Samples `x<index>`; `None` if any bit is X or Z.
    pub fn register(&self, index: u8) -> Result<Option<u64>, VerifyError> {
        if index > 31 {
            return Err(VerifyError::InvalidRegister(index));
        }
        Ok(self.target.read_register(index)?.to_u64())
    }

    /// Samples `x<index>`, applying the undefined-register policy.
    pub fn register_value(&self, index: u8) -> Result<u64, VerifyError> {
        match (self.register(index)?, self.undefined) {
            (Some(value), _) => Ok(value),
            (None, UndefinedPolicy::Reject) => Err(VerifyError::UndefinedRegister { index }),
            (None, UndefinedPolicy::Zero) => {
                warn!(register = index, "undefined register read as zero");
                Ok(0)
            }
        }
    }

    /// The data memory.
    pub fn memory(&self) -> Result<&'a MemoryImage, VerifyError> {
        self.data_memory.ok_or(VerifyError::NoDataMemory)
    }

    /// Reads the little-endian 32-bit word at a byte address of data memory.
    pub fn read_u32(&self, byte_addr: u64) -> Result<u32, VerifyError> {
        Ok(self.memory()?.read_u32_le(byte_addr)?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A register-file-only target for unit tests.

    use rvbench_common::LogicVec;
    use rvbench_sim::{ClockEdge, SignalHandle, SimError, SimTarget};

    pub struct Regs(pub [Option<u64>; 32]);

    impl Regs {
        pub fn new() -> Self {
            Self([Some(0); 32])
        }

        pub fn with(mut self, index: usize, value: Option<u64>) -> Self {
            self.0[index] = value;
            self
        }
    }

    impl SimTarget for Regs {
        fn resolve(&self, name: &str) -> Result<SignalHandle, SimError> {
            Err(SimError::UnknownSignal { name: name.into() })
        }
        fn width(&self, handle: SignalHandle) -> Result<u32, SimError> {
            Err(SimError::InvalidHandle(handle.as_raw()))
        }
        fn read(&self, handle: SignalHandle) -> Result<LogicVec, SimError> {
            Err(SimError::InvalidHandle(handle.as_raw()))
        }
        fn write(&mut self, handle: SignalHandle, _value: LogicVec) -> Result<(), SimError> {
            Err(SimError::InvalidHandle(handle.as_raw()))
        }
        fn read_register(&self, index: u8) -> Result<LogicVec, SimError> {
            Ok(match self.0[index as usize] {
                Some(v) => LogicVec::from_u64(v, 32),
                None => LogicVec::all_x(32),
            })
        }
        fn eval_edge(&mut self, _edge: ClockEdge) -> Result<(), SimError> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Regs;
    use super::*;

    #[test]
    fn reads_registers() {
        let regs = Regs::new().with(5, Some(0x1234));
        let probe = Probe::new(&regs, None, UndefinedPolicy::Reject);
        assert_eq!(probe.register(5).unwrap(), Some(0x1234));
        assert_eq!(probe.register_value(5).unwrap(), 0x1234);
        assert!(matches!(
            probe.register(32),
            Err(VerifyError::InvalidRegister(32))
        ));
    }

    #[test]
    fn undefined_policy() {
        let regs = Regs::new().with(1, None);
        let strict = Probe::new(&regs, None, UndefinedPolicy::Reject);
        assert_eq!(strict.register(1).unwrap(), None);
        assert!(matches!(
            strict.register_value(1),
            Err(VerifyError::UndefinedRegister { index: 1 })
        ));
        let lenient = Probe::new(&regs, None, UndefinedPolicy::Zero);
        assert_eq!(lenient.register_value(1).unwrap(), 0);
    }

    #[test]
    fn memory_access() {
        let regs = Regs::new();
        let none = Probe::new(&regs, None, UndefinedPolicy::Reject);
        assert!(matches!(none.read_u32(0), Err(VerifyError::NoDataMemory)));
        let mut mem = MemoryImage::new(16, 32).unwrap();
        mem.write_word(1, 0xABCD).unwrap();
        let probe = Probe::new(&regs, Some(&mem), UndefinedPolicy::Reject);
        assert_eq!(probe.read_u32(4).unwrap(), 0xABCD);
    }

    #[test]
    fn policy_deserializes_lowercase() {
        let p: UndefinedPolicy = serde_json::from_str("\"zero\"").unwrap();
        assert_eq!(p, UndefinedPolicy::Zero);
    }
}
