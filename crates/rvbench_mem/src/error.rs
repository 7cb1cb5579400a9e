//! Error types for memory images, image loading, and bus slave models.

use std::path::PathBuf;

use rvbench_sim::SimError;

/// Errors raised by memory images and the models that serve them.
#[derive(Debug, thiserror::Error)]
pub enum MemError {
    /// A program image line could not be parsed.
    #[error("line {line}: {reason}")]
    Format {
        /// 1-based line number in the image file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The loader word size is not a power of two or does not fit the memory.
    ///
    /// Reported apart from [`MemError::Format`] since it concerns the
    /// caller's arguments rather than any line of the image.
    #[error("invalid word size {size}: must be a power of two no wider than {data_width} bits")]
    InvalidWordSize {
        /// Requested word size in bytes.
        size: usize,
        /// Data width of the target memory in bits.
        data_width: u32,
    },

    /// A memory was configured with an unusable address or data width.
    #[error("invalid memory geometry: {reason}")]
    InvalidWidth {
        /// Why the geometry was rejected.
        reason: String,
    },

    /// A word address does not fit the configured address width.
    #[error("address {addr:#x} out of range for {addr_width}-bit address space")]
    OutOfRange {
        /// The offending word address.
        addr: u64,
        /// Configured address width in bits.
        addr_width: u32,
    },

    /// A data value or mask does not fit the configured data width.
    #[error("value {value:#x} overflows {data_width}-bit word")]
    Overflow {
        /// The offending value.
        value: u64,
        /// Configured data width in bits.
        data_width: u32,
    },

    /// A bus transfer size code cannot be served by the bus.
    #[error("unsupported transfer size code {size} on {bus_width}-bit bus")]
    UnsupportedSize {
        /// The size code sampled from the bus.
        size: u64,
        /// Data bus width in bits.
        bus_width: u32,
    },

    /// An image file could not be opened.
    #[error("cannot open '{}': {source}", path.display())]
    Open {
        /// Path of the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading image data failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signal access failed while serving the bus.
    #[error(transparent)]
    Sim(#[from] SimError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_display() {
        let err = MemError::Format {
            line: 3,
            reason: "data before address marker".into(),
        };
        assert_eq!(err.to_string(), "line 3: data before address marker");
    }

    #[test]
    fn out_of_range_display() {
        let err = MemError::OutOfRange {
            addr: 0x1_0000,
            addr_width: 16,
        };
        assert_eq!(
            err.to_string(),
            "address 0x10000 out of range for 16-bit address space"
        );
    }

    #[test]
    fn overflow_display() {
        let err = MemError::Overflow {
            value: 0x1_0000,
            data_width: 16,
        };
        assert_eq!(err.to_string(), "value 0x10000 overflows 16-bit word");
    }

    #[test]
    fn unsupported_size_display() {
        let err = MemError::UnsupportedSize {
            size: 3,
            bus_width: 32,
        };
        assert_eq!(
            err.to_string(),
            "unsupported transfer size code 3 on 32-bit bus"
        );
    }

    #[test]
    fn invalid_word_size_display() {
        let err = MemError::InvalidWordSize {
            size: 3,
            data_width: 32,
        };
        assert!(err.to_string().starts_with("invalid word size 3"));
    }

    #[test]
    fn open_display() {
        let err = MemError::Open {
            path: PathBuf::from("prog.verilog"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot open 'prog.verilog': not found");
    }

    #[test]
    fn sim_is_transparent() {
        let err = MemError::from(SimError::UnknownSignal {
            name: "hrdata".into(),
        });
        assert_eq!(err.to_string(), "unknown signal 'hrdata'");
    }
}
