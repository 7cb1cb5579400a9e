//! Error types for completion detection and result verification.

use std::path::PathBuf;

use rvbench_mem::MemError;
use rvbench_sim::SimError;

/// Errors raised while detecting completion or verifying a result.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// A golden or reference file is malformed.
    #[error("line {line}: {reason}")]
    Format {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A live register differs from its golden value.
    #[error("register x{index} ({name}): expected {expected:#010x}, actual {actual:#010x}")]
    Mismatch {
        /// Register index.
        index: u8,
        /// ABI name from the golden file.
        name: String,
        /// Golden value.
        expected: u64,
        /// Value read from the design.
        actual: u64,
    },

    /// The signature artifact differs from the reference file.
    #[error(
        "signature mismatch at byte {offset} (line {line}, address {address:#x}): \
         expected '{expected}', actual '{actual}'"
    )]
    SignatureMismatch {
        /// Byte offset of the first difference in the files.
        offset: usize,
        /// 1-based line containing the difference.
        line: usize,
        /// Memory address of the signature word on that line.
        address: u64,
        /// Reference line, or `<eof>`.
        expected: String,
        /// Artifact line, or `<eof>`.
        actual: String,
    },

    /// The signature pointers do not delimit a region.
    #[error("invalid signature region [{begin:#x}, {end:#x})")]
    InvalidSignatureRegion {
        /// Begin pointer.
        begin: u64,
        /// End pointer.
        end: u64,
    },

    /// The design wrote the failure pattern to its result registers.
    #[error("test signalled failure: x{} = {:#x}, x{} = {:#x}, x{} = {:#x}",
        .registers[0], .values[0], .registers[1], .values[1], .registers[2], .values[2])]
    FailPattern {
        /// Registers that carry the pattern.
        registers: [u8; 3],
        /// Values observed in them.
        values: [u64; 3],
    },

    /// Completion carried no pass indication.
    #[error("test completed without signalling pass")]
    NotPassed,

    /// A register held X or Z bits where a value was required.
    #[error("register x{index} is undefined")]
    UndefinedRegister {
        /// Register index.
        index: u8,
    },

    /// A register index outside `x0..=x31`.
    #[error("no such register x{0}")]
    InvalidRegister(u8),

    /// Memory-based checks were requested but no data memory is attached.
    #[error("no data memory is attached to the probe")]
    NoDataMemory,

    /// A golden or reference file could not be opened.
    #[error("cannot open '{}': {source}", path.display())]
    Open {
        /// Path of the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A memory access failed.
    #[error(transparent)]
    Mem(#[from] MemError),

    /// A signal access failed.
    #[error(transparent)]
    Sim(#[from] SimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_display() {
        let err = VerifyError::Mismatch {
            index: 1,
            name: "ra".into(),
            expected: 0xDEAD_BEEF,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "register x1 (ra): expected 0xdeadbeef, actual 0x00000000"
        );
    }

    #[test]
    fn signature_mismatch_display() {
        let err = VerifyError::SignatureMismatch {
            offset: 9,
            line: 2,
            address: 0x104,
            expected: "00000002".into(),
            actual: "0000000f".into(),
        };
        assert_eq!(
            err.to_string(),
            "signature mismatch at byte 9 (line 2, address 0x104): expected '00000002', actual '0000000f'"
        );
    }

    #[test]
    fn fail_pattern_display() {
        let err = VerifyError::FailPattern {
            registers: [1, 2, 3],
            values: [0xF, 0xF, 0xF],
        };
        assert_eq!(
            err.to_string(),
            "test signalled failure: x1 = 0xf, x2 = 0xf, x3 = 0xf"
        );
    }

    #[test]
    fn undefined_register_display() {
        assert_eq!(
            VerifyError::UndefinedRegister { index: 5 }.to_string(),
            "register x5 is undefined"
        );
    }

    #[test]
    fn mem_is_transparent() {
        let err = VerifyError::from(MemError::OutOfRange {
            addr: 0x4000,
            addr_width: 12,
        });
        assert!(err.to_string().starts_with("address 0x4000 out of range"));
    }
}
