//! `rvbench image`, `rvbench golden` and `rvbench signature`.

use std::fmt::Write as _;
use std::path::Path;

use rvbench_mem::{load_hex_dump_file, load_word_lines_file, MemoryImage};
use rvbench_verify::{compare_signature_files, GoldenRecord};
use tracing::debug;

use crate::{GlobalArgs, ImageArgs, ImageFormat, SignatureArgs};

/// Decodes a program image and prints `address: value` for every non-zero word.
pub fn image(args: &ImageArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let data_width = u32::try_from(args.word_size * 8)?;
    let mut memory = MemoryImage::new(args.addr_width, data_width)?;
    let path = Path::new(&args.file);
    let summary = match args.format {
        ImageFormat::HexDump => load_hex_dump_file(&mut memory, path, args.word_size)?,
        ImageFormat::Plain => load_word_lines_file(&mut memory, path)?,
    };
    print!("{}", render_image(&memory));
    if !global.quiet {
        eprintln!(
            "   Loaded {} word write(s), {} non-zero word(s){}",
            summary.words,
            memory.word_count(),
            match (summary.lowest, summary.highest) {
                (Some(lo), Some(hi)) if global.verbose => format!(" in [{lo:#x}, {hi:#x}]"),
                _ => String::new(),
            }
        );
    }
    Ok(0)
}

/// Parses a golden register file and prints one `xN (name) = value` line per entry.
pub fn golden(file: &str, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let record = GoldenRecord::from_file(Path::new(file))?;
    debug!(file, registers = record.len(), "parsed golden record");
    print!("{}", render_golden(&record));
    if !global.quiet {
        eprintln!("   Parsed {} register(s)", record.len());
    }
    Ok(0)
}

/// Compares a signature artifact with its reference. Exit code 1 on mismatch.
pub fn signature(args: &SignatureArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    match compare_signature_files(Path::new(&args.artifact), Path::new(&args.reference), args.begin) {
        Ok(()) => {
            if !global.quiet {
                eprintln!("   PASS  {} matches {}", args.artifact, args.reference);
            }
            Ok(0)
        }
        Err(e @ rvbench_verify::VerifyError::SignatureMismatch { .. }) => {
            eprintln!("   FAIL  {}: {e}", args.artifact);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn render_image(memory: &MemoryImage) -> String {
    let addr_digits = memory.addr_width().div_ceil(4) as usize;
    let data_digits = (memory.data_width() / 4) as usize;
    let mut out = String::new();
    for (addr, value) in memory.iter() {
        let _ = writeln!(out, "{addr:0addr_digits$x}: {value:0data_digits$x}");
    }
    out
}

fn render_golden(record: &GoldenRecord) -> String {
    let mut out = String::new();
    for entry in record.entries() {
        let _ = writeln!(
            out,
            "x{:<2} ({}) = {:#010x}",
            entry.index, entry.name, entry.value
        );
    }
    out
}
