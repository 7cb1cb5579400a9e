//! Waveform recording of traced harness signals.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! writes IEEE 1364 Value Change Dump text that GTKWave or Surfer can open,
//! which is the quickest way to see why a bus transfer went wrong.

use std::io::Write;

use rvbench_common::LogicVec;

use crate::error::SimError;
use crate::signal::SignalHandle;

/// Sink for value changes of traced signals.
pub trait WaveformRecorder {
    /// Declares a signal to be recorded.
    fn register_signal(&mut self, handle: SignalHandle, name: &str, width: u32)
        -> Result<(), SimError>;

    /// Opens a scope in the waveform hierarchy.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at `time_fs`.
    fn record_change(
        &mut self,
        time_fs: u64,
        handle: SignalHandle,
        value: &LogicVec,
    ) -> Result<(), SimError>;

    /// Flushes the output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD recorder with a femtosecond timescale.
///
/// Identifier codes are printable ASCII characters starting from `!`.
pub struct VcdRecorder<W: Write> {
    writer: W,
    ids: Vec<(SignalHandle, String, u32)>,
    header_written: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a recorder writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            ids: Vec::new(),
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  rvbench {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    fn make_id_code(index: usize) -> String {
        let mut code = String::new();
        let mut idx = index;
        loop {
            code.push((b'!' + (idx % 94) as u8) as char);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        code
    }

    /// Scalar `0!` or vector `b0101 !` text for a change, resized to the
    /// declared width.
    fn format_change(value: &LogicVec, width: u32, code: &str) -> String {
        let value = value.resized(width);
        if width == 1 {
            return format!("{}{code}", value.get(0).to_vcd_char());
        }
        let bits: String = (0..width)
            .rev()
            .map(|i| value.get(i).to_vcd_char())
            .collect();
        format!("b{bits} {code}")
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(
        &mut self,
        handle: SignalHandle,
        name: &str,
        width: u32,
    ) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = Self::make_id_code(self.ids.len());
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        self.ids.push((handle, code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(
        &mut self,
        time_fs: u64,
        handle: SignalHandle,
        value: &LogicVec,
    ) -> Result<(), SimError> {
        self.ensure_header()?;
        if self.current_time != Some(time_fs) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }

        let (_, code, width) = self
            .ids
            .iter()
            .find(|(h, _, _)| *h == handle)
            .ok_or(SimError::InvalidHandle(handle.as_raw()))?;
        let line = Self::format_change(value, *width, code);
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
