//! Run-time settings of the orchestrator.

use std::path::{Path, PathBuf};

use rvbench_config::{HarnessSettings, MemorySettings, RvbenchConfig, SignalNames};
use rvbench_sim::SimTime;
use rvbench_verify::{SignaturePointers, UndefinedPolicy};

/// Everything the orchestrator needs besides the test itself.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Clock period.
    pub clock_period: SimTime,
    /// Interval between completion polls.
    pub poll_interval: SimTime,
    /// How long reset is held before release.
    pub reset_settle: SimTime,
    /// Undefined-register policy handed to verifiers.
    pub undefined: UndefinedPolicy,
    /// Directory for signatures and waveforms.
    pub output_dir: PathBuf,
    /// Whether to record a VCD per test.
    pub waveform: bool,
    /// Memory layout.
    pub memory: MemorySettings,
    /// Design signal names.
    pub signals: SignalNames,
    /// Signature pointer locations.
    pub signature: SignaturePointers,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::from_parts(
            &HarnessSettings::default(),
            MemorySettings::default(),
            SignalNames::default(),
            SignaturePointers::default(),
        )
    }
}

impl HarnessConfig {
    /// Builds settings from a loaded configuration, anchoring the output
    /// directory at `root`.
    pub fn from_config(config: &RvbenchConfig, root: &Path) -> Self {
        let mut settings = Self::from_parts(
            &config.harness,
            config.memory.clone(),
            config.signals.clone(),
            config.signature.into(),
        );
        settings.output_dir = root.join(&settings.output_dir);
        settings
    }

    fn from_parts(
        harness: &HarnessSettings,
        memory: MemorySettings,
        signals: SignalNames,
        signature: SignaturePointers,
    ) -> Self {
        Self {
            clock_period: harness.clock_period,
            poll_interval: harness.poll_interval,
            reset_settle: harness.reset_settle,
            undefined: harness.undefined,
            output_dir: harness.output_dir.clone(),
            waveform: harness.waveform,
            memory,
            signals,
            signature,
        }
    }
}
