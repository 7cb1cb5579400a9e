//! Golden register files.
//!
//! A golden file is a sequence of two-line records,
//!
//! ```text
//! ra (x1)
//! 0xffffffff
//! sp (x2)
//! 0x000000ff
//! ```
//!
//! terminated by a blank line or the end of the file.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use serde::Serialize;

use crate::error::VerifyError;

/// One expected register value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoldenEntry {
    /// ABI name as written in the file.
    pub name: String,
    /// Register index.
    pub index: u8,
    /// Expected value.
    pub value: u64,
}

/// The expected register values of one test, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoldenRecord {
    entries: Vec<GoldenEntry>,
}

impl GoldenRecord {
    /// Builds a record from entries, rejecting duplicate or invalid indices.
    pub fn from_entries(entries: Vec<GoldenEntry>) -> Result<Self, VerifyError> {
        let mut seen = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            if entry.index > 31 {
                return Err(VerifyError::InvalidRegister(entry.index));
            }
            if !seen.insert(entry.index) {
                return Err(VerifyError::Format {
                    line: 2 * i + 1,
                    reason: format!("duplicate register x{}", entry.index),
                });
            }
        }
        Ok(Self { entries })
    }

    /// Parses a golden file from a reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, VerifyError> {
        let mut lines = reader.lines().enumerate();
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        while let Some((idx, header)) = lines.next() {
            let header = header?;
            let header = header.trim();
            if header.is_empty() {
                break;
            }
            let header_line = idx + 1;
            let (name, index) = parse_header(header, header_line)?;
            if !seen.insert(index) {
                return Err(VerifyError::Format {
                    line: header_line,
                    reason: format!("duplicate register x{index}"),
                });
            }

            let value_line = header_line + 1;
            let value = match lines.next() {
                Some((_, line)) => line?,
                None => String::new(),
            };
            let value = value.trim();
            if value.is_empty() {
                return Err(VerifyError::Format {
                    line: value_line,
                    reason: format!("missing value for register {name} (x{index})"),
                });
            }
            let value = parse_value(value, value_line)?;
            entries.push(GoldenEntry { name, index, value });
        }

        Ok(Self { entries })
    }

    /// Parses a golden file from a string.
    pub fn parse_str(text: &str) -> Result<Self, VerifyError> {
        Self::parse(Cursor::new(text))
    }

    /// Opens and parses a golden file.
    pub fn from_file(path: &Path) -> Result<Self, VerifyError> {
        let file = File::open(path).map_err(|source| VerifyError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(BufReader::new(file))
    }

    /// Entries in file order.
    pub fn entries(&self) -> &[GoldenEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the record has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register indices in file order.
    pub fn indices(&self) -> Vec<u8> {
        self.entries.iter().map(|e| e.index).collect()
    }
}

/// Parses `name (xN)`.
fn parse_header(header: &str, line: usize) -> Result<(String, u8), VerifyError> {
    let malformed = || VerifyError::Format {
        line,
        reason: format!("malformed register header '{header}'"),
    };
    let (name, rest) = header.split_once(' ').ok_or_else(malformed)?;
    let reg = rest
        .trim()
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_word(name) || !is_word(reg) {
        return Err(malformed());
    }
    let index: u8 = reg
        .strip_prefix('x')
        .and_then(|n| n.parse().ok())
        .ok_or_else(malformed)?;
    if index > 31 {
        return Err(VerifyError::Format {
            line,
            reason: format!("register index x{index} out of range"),
        });
    }
    Ok((name.to_string(), index))
}

/// Parses `0x<hex>`.
fn parse_value(text: &str, line: usize) -> Result<u64, VerifyError> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok())
        .ok_or_else(|| VerifyError::Format {
            line,
            reason: format!("invalid register value '{text}'"),
        })
}
