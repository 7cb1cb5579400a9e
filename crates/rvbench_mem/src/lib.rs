//! Simulated memories for the rvbench harness.
//!
//! [`MemoryImage`] is the sparse word store every test loads its program
//! into. The bus models own an image and serve it to the design through the
//! clock-edge scheduling of `rvbench_sim`:
//!
//! - [`AhbLiteSlave`] — pipelined AHB-Lite slave, zero wait states
//! - [`SyncRamPort`] — synchronous 1RW RAM with one cycle of latency
//! - [`SramPort`] — external 16-bit asynchronous SRAM with byte lanes

#![warn(missing_docs)]

pub mod ahb;
pub mod error;
pub mod image;
pub mod loader;
pub mod sram;
pub mod sync_ram;

pub use ahb::{byte_enable, AhbLiteSlave, AhbPortSignals, PendingTransaction, TransferCounts};
pub use error::MemError;
pub use image::MemoryImage;
pub use loader::{
    load_hex_dump, load_hex_dump_file, load_word_lines, load_word_lines_file, LoadSummary,
};
pub use sram::{SramPort, SramSignals};
pub use sync_ram::{SyncRamPort, SyncRamSignals};
