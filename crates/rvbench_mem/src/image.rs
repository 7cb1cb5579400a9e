//! Sparse, width-checked word store backing every simulated memory.

use std::collections::BTreeMap;
use std::path::Path;

use rvbench_common::{fits_width, width_mask};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::MemError;
use crate::loader::{self, LoadSummary};

/// A word-addressed memory with `2^addr_width` words of `data_width` bits.
///
/// Only written words are stored; every other address reads as zero. All
/// accesses are bounds-checked and never clamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryImage {
    addr_width: u32,
    data_width: u32,
    words: BTreeMap<u64, u64>,
}

impl MemoryImage {
    /// Creates an empty memory.
    ///
    /// `addr_width` must be in `1..=64`; `data_width` one of 8, 16, 32 or 64.
    pub fn new(addr_width: u32, data_width: u32) -> Result<Self, MemError> {
        if !(1..=64).contains(&addr_width) {
            return Err(MemError::InvalidWidth {
                reason: format!("address width {addr_width} is not in 1..=64"),
            });
        }
        if !matches!(data_width, 8 | 16 | 32 | 64) {
            return Err(MemError::InvalidWidth {
                reason: format!("data width {data_width} is not 8, 16, 32 or 64"),
            });
        }
        Ok(Self {
            addr_width,
            data_width,
            words: BTreeMap::new(),
        })
    }

    /// Address width in bits.
    pub fn addr_width(&self) -> u32 {
        self.addr_width
    }

    /// Data width in bits.
    pub fn data_width(&self) -> u32 {
        self.data_width
    }

    /// Bytes per word.
    pub fn word_bytes(&self) -> u64 {
        u64::from(self.data_width / 8)
    }

    /// Reads the word at `addr`, zero if never written.
    pub fn read(&self, addr: u64) -> Result<u64, MemError> {
        self.check_addr(addr)?;
        Ok(self.words.get(&addr).copied().unwrap_or(0))
    }

    /// Merges `data` into the word at `addr` under `mask`.
    ///
    /// The stored word becomes `data & mask | old & !mask`.
    pub fn write(&mut self, addr: u64, data: u64, mask: u64) -> Result<(), MemError> {
        self.check_addr(addr)?;
        for value in [data, mask] {
            if !fits_width(value, self.data_width) {
                return Err(MemError::Overflow {
                    value,
                    data_width: self.data_width,
                });
            }
        }
        let old = self.words.get(&addr).copied().unwrap_or(0);
        let merged = (data & mask) | (old & !mask);
        if merged == 0 {
            self.words.remove(&addr);
        } else {
            self.words.insert(addr, merged);
        }
        Ok(())
    }

    /// Writes a full word.
    pub fn write_word(&mut self, addr: u64, data: u64) -> Result<(), MemError> {
        self.write(addr, data, width_mask(self.data_width))
    }

    /// Resets words `0..size` to zero.
    pub fn clear(&mut self, size: u64) {
        let kept = self.words.split_off(&size);
        let cleared = self.words.len();
        self.words = kept;
        debug!(size, cleared, "cleared memory");
    }

    /// Number of non-zero words.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if every word reads zero.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Non-zero words in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.words.iter().map(|(&a, &v)| (a, v))
    }

    /// Reads the little-endian 32-bit value at a byte address, assembling it
    /// from as many words as the memory's data width requires.
    pub fn read_u32_le(&self, byte_addr: u64) -> Result<u32, MemError> {
        let word_bytes = self.word_bytes();
        let shift = word_bytes.trailing_zeros();
        let mut value = 0u32;
        for i in 0..4u64 {
            let byte_addr = byte_addr.wrapping_add(i);
            let word = self.read(byte_addr >> shift)?;
            let lane = byte_addr & (word_bytes - 1);
            let byte = (word >> (8 * lane)) & 0xFF;
            value |= (byte as u32) << (8 * i);
        }
        Ok(value)
    }

    /// Loads an addressed hex dump file, returning what was written.
    ///
    /// See [`loader::load_hex_dump`] for the format.
    pub fn load(&mut self, path: &Path, word_size: usize) -> Result<LoadSummary, MemError> {
        let summary = loader::load_hex_dump_file(self, path, word_size)?;
        info!(
            path = %path.display(),
            words = summary.words,
            lowest = ?summary.lowest,
            highest = ?summary.highest,
            "loaded program image"
        );
        Ok(summary)
    }

    fn check_addr(&self, addr: u64) -> Result<(), MemError> {
        if fits_width(addr, self.addr_width) {
            Ok(())
        } else {
            Err(MemError::OutOfRange {
                addr,
                addr_width: self.addr_width,
            })
        }
    }
}
