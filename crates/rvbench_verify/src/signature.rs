//! Compliance-test signatures.
//!
//! A compliance test fills a memory region with its observable results and
//! publishes the region's bounds through two pointer words at fixed
//! addresses. The region is dumped one 32-bit word per line, as eight
//! lowercase hex digits, and compared byte-for-byte with a reference file.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rvbench_mem::MemoryImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::VerifyError;

/// Default byte address of the signature-begin pointer.
pub const DEFAULT_BEGIN_PTR: u64 = 0x3FF0;
/// Default byte address of the signature-end pointer.
pub const DEFAULT_END_PTR: u64 = 0x3FF4;

/// Where the signature bounds are published in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignaturePointers {
    /// Byte address of the begin pointer.
    pub begin: u64,
    /// Byte address of the end pointer.
    pub end: u64,
}

impl Default for SignaturePointers {
    fn default() -> Self {
        Self {
            begin: DEFAULT_BEGIN_PTR,
            end: DEFAULT_END_PTR,
        }
    }
}

impl SignaturePointers {
    /// Reads the current bounds from `memory`.
    pub fn read(&self, memory: &MemoryImage) -> Result<SignatureRegion, VerifyError> {
        Ok(SignatureRegion {
            begin: u64::from(memory.read_u32_le(self.begin)?),
            end: u64::from(memory.read_u32_le(self.end)?),
        })
    }
}

/// The byte range `[begin, end)` holding a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureRegion {
    /// First byte.
    pub begin: u64,
    /// One past the last byte.
    pub end: u64,
}

impl SignatureRegion {
    /// Returns `true` once the test has published its bounds:
    /// `begin > 0xF` and `end > begin`.
    pub fn is_valid(&self) -> bool {
        self.begin > 0xF && self.end > self.begin
    }

    /// Word addresses of the region in 4-byte steps.
    pub fn addresses(&self) -> impl Iterator<Item = u64> {
        (self.begin..self.end).step_by(4)
    }
}

/// Renders `region` of `memory` as signature text.
pub fn dump_signature(memory: &MemoryImage, region: SignatureRegion) -> Result<String, VerifyError> {
    if !region.is_valid() {
        return Err(VerifyError::InvalidSignatureRegion {
            begin: region.begin,
            end: region.end,
        });
    }
    let mut text = String::new();
    for addr in region.addresses() {
        let _ = writeln!(text, "{:08x}", memory.read_u32_le(addr)?);
    }
    Ok(text)
}

/// Writes the signature of `region` to `path`, creating parent directories.
pub fn write_signature(
    memory: &MemoryImage,
    region: SignatureRegion,
    path: &Path,
) -> Result<String, VerifyError> {
    info!(
        begin = format_args!("{:#x}", region.begin),
        end = format_args!("{:#x}", region.end),
        path = %path.display(),
        "dumping signature"
    );
    let text = dump_signature(memory, region)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &text)?;
    Ok(text)
}

/// Compares signature bytes with reference bytes.
///
/// `begin` is the address of the first signature word; it is only used to
/// name the memory address of a differing line.
pub fn compare_signature(actual: &[u8], expected: &[u8], begin: u64) -> Result<(), VerifyError> {
    let Some(offset) = first_difference(actual, expected) else {
        debug!(bytes = actual.len(), "signature matches reference");
        return Ok(());
    };
    let line_idx = actual[..offset.min(actual.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count();
    Err(VerifyError::SignatureMismatch {
        offset,
        line: line_idx + 1,
        address: begin + 4 * line_idx as u64,
        expected: nth_line(expected, line_idx),
        actual: nth_line(actual, line_idx),
    })
}

/// Reads both files and compares them.
pub fn compare_signature_files(
    artifact: &Path,
    reference: &Path,
    begin: u64,
) -> Result<(), VerifyError> {
    let read = |path: &Path| {
        fs::read(path).map_err(|source| VerifyError::Open {
            path: path.to_path_buf(),
            source,
        })
    };
    compare_signature(&read(artifact)?, &read(reference)?, begin)
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    match a.iter().zip(b).position(|(x, y)| x != y) {
        Some(pos) => Some(pos),
        None if a.len() != b.len() => Some(a.len().min(b.len())),
        None => None,
    }
}

fn nth_line(bytes: &[u8], n: usize) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .nth(n)
        .map_or_else(|| "<eof>".to_string(), str::to_string)
}
