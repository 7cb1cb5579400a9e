//! Program image loaders.
//!
//! Two text formats are understood:
//!
//! - **Addressed hex dump** (`objcopy -O verilog`): lines are either an
//!   address marker `@<hex byte address>` or whitespace-separated hex byte
//!   tokens. Tokens are grouped `word_size` at a time, assembled
//!   little-endian, and stored at word address `cursor >> log2(word_size)`.
//! - **Word lines**: one hex word per line, stored at consecutive word
//!   addresses from zero.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rvbench_common::width_mask;
use serde::Serialize;

use crate::error::MemError;
use crate::image::MemoryImage;

/// What a load wrote into the image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Number of word writes performed.
    pub words: usize,
    /// Lowest word address written.
    pub lowest: Option<u64>,
    /// Highest word address written.
    pub highest: Option<u64>,
}

impl LoadSummary {
    fn record(&mut self, addr: u64) {
        self.words += 1;
        self.lowest = Some(self.lowest.map_or(addr, |low| low.min(addr)));
        self.highest = Some(self.highest.map_or(addr, |high| high.max(addr)));
    }
}

/// Parses an addressed hex dump into `image`.
///
/// A trailing chunk shorter than `word_size` only updates the byte lanes it
/// covers. Address markers must be aligned to `word_size`; a misaligned
/// marker is a format error rather than being rounded down to a word.
pub fn load_hex_dump<R: BufRead>(
    image: &mut MemoryImage,
    reader: R,
    word_size: usize,
) -> Result<LoadSummary, MemError> {
    if !word_size.is_power_of_two() || word_size as u64 > image.word_bytes() {
        return Err(MemError::InvalidWordSize {
            size: word_size,
            data_width: image.data_width(),
        });
    }
    let shift = word_size.trailing_zeros();
    let mut cursor: Option<u64> = None;
    let mut summary = LoadSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(rest) = text.strip_prefix('@') {
            let addr = u64::from_str_radix(rest.trim(), 16).map_err(|_| MemError::Format {
                line: line_no,
                reason: format!("malformed address marker '{text}'"),
            })?;
            if addr % word_size as u64 != 0 {
                return Err(MemError::Format {
                    line: line_no,
                    reason: format!("address {addr:#x} is not aligned to {word_size}-byte words"),
                });
            }
            cursor = Some(addr);
            continue;
        }

        let Some(mut addr) = cursor else {
            return Err(MemError::Format {
                line: line_no,
                reason: "data before address marker".into(),
            });
        };

        let bytes = text
            .split_whitespace()
            .map(|tok| parse_byte(tok, line_no))
            .collect::<Result<Vec<u8>, _>>()?;

        for chunk in bytes.chunks(word_size) {
            let value = chunk
                .iter()
                .enumerate()
                .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)));
            let mask = width_mask(8 * chunk.len() as u32);
            let word_addr = addr >> shift;
            image.write(word_addr, value, mask)?;
            summary.record(word_addr);
            addr = addr.wrapping_add(word_size as u64);
        }
        cursor = Some(addr);
    }

    Ok(summary)
}

/// Opens `path` and parses it with [`load_hex_dump`].
pub fn load_hex_dump_file(
    image: &mut MemoryImage,
    path: &Path,
    word_size: usize,
) -> Result<LoadSummary, MemError> {
    let file = File::open(path).map_err(|source| MemError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_hex_dump(image, BufReader::new(file), word_size)
}

/// Parses one hex word per line into consecutive word addresses from zero.
///
/// Blank lines are skipped without consuming an address. A `0x` prefix is
/// accepted.
pub fn load_word_lines<R: BufRead>(
    image: &mut MemoryImage,
    reader: R,
) -> Result<LoadSummary, MemError> {
    let mut summary = LoadSummary::default();
    let mut addr = 0u64;
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        let value = u64::from_str_radix(digits, 16).map_err(|_| MemError::Format {
            line: idx + 1,
            reason: format!("invalid hex word '{text}'"),
        })?;
        image.write_word(addr, value)?;
        summary.record(addr);
        addr += 1;
    }
    Ok(summary)
}

/// Opens `path` and parses it with [`load_word_lines`].
pub fn load_word_lines_file(image: &mut MemoryImage, path: &Path) -> Result<LoadSummary, MemError> {
    let file = File::open(path).map_err(|source| MemError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_word_lines(image, BufReader::new(file))
}

fn parse_byte(token: &str, line: usize) -> Result<u8, MemError> {
    let value = u64::from_str_radix(token, 16).map_err(|_| MemError::Format {
        line,
        reason: format!("invalid hex token '{token}'"),
    })?;
    u8::try_from(value).map_err(|_| MemError::Format {
        line,
        reason: format!("byte token '{token}' exceeds 0xff"),
    })
}
