//! Configuration types deserialized from `rvbench.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::PathBuf;

use rvbench_sim::SimTime;
use rvbench_verify::{SignaturePointers, UndefinedPolicy};

/// The top-level harness configuration parsed from `rvbench.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RvbenchConfig {
    /// Project metadata.
    pub project: ProjectMeta,
    /// Clocking, polling and output settings.
    #[serde(default)]
    pub harness: HarnessSettings,
    /// Simulated memory layout.
    #[serde(default)]
    pub memory: MemorySettings,
    /// Signature pointer locations.
    #[serde(default)]
    pub signature: SignatureSettings,
    /// Names of the design's clock, reset and bus signals.
    #[serde(default)]
    pub signals: SignalNames,
    /// Named test suites.
    #[serde(default)]
    pub suites: BTreeMap<String, SuiteConfig>,
}

/// Project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the design under test.
    #[serde(default)]
    pub description: String,
}

/// Virtual-time and output settings shared by every test.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Clock period (default `10ns`).
    #[serde(deserialize_with = "deserialize_duration")]
    pub clock_period: SimTime,
    /// Interval between completion polls (default `100ns`).
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: SimTime,
    /// How long reset is held before release (default `50ns`).
    #[serde(deserialize_with = "deserialize_duration")]
    pub reset_settle: SimTime,
    /// Timeout for suites that do not set one; the family default otherwise.
    #[serde(deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<SimTime>,
    /// Directory receiving signatures and waveforms.
    pub output_dir: PathBuf,
    /// How undefined register values are treated during verification.
    pub undefined: UndefinedPolicy,
    /// Whether to write a VCD of the clock, reset and bus signals per test.
    pub waveform: bool,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            clock_period: SimTime::from_ns(10),
            poll_interval: SimTime::from_ns(100),
            reset_settle: SimTime::from_ns(50),
            timeout: None,
            output_dir: PathBuf::from("build/rvbench"),
            undefined: UndefinedPolicy::Reject,
            waveform: false,
        }
    }
}

/// Simulated memory layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Which memories the design is connected to.
    pub topology: Topology,
    /// Word-address width of each memory.
    pub addr_width: u32,
    /// Number of words cleared before loading.
    pub clear_words: u64,
    /// Interface of the instruction memory in the split topology.
    pub instruction_port: InstructionPort,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            topology: Topology::Unified,
            addr_width: 16,
            clear_words: 1 << 13,
            instruction_port: InstructionPort::Ahb,
        }
    }
}

impl MemorySettings {
    /// Bytes per memory word, which is also the image-loader word size.
    pub fn word_bytes(&self) -> usize {
        match self.topology {
            Topology::Unified | Topology::Split => 4,
            Topology::Sram => 2,
        }
    }
}

/// Memory topology of the system around the core.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// One 32-bit memory behind the data bus port.
    #[default]
    Unified,
    /// Separate instruction and data memories, both holding the image.
    Split,
    /// External 16-bit SRAM.
    Sram,
}

/// Interface of the instruction memory.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstructionPort {
    /// AHB-Lite slave.
    #[default]
    Ahb,
    /// Synchronous RAM with one cycle of latency.
    Sync,
}

/// Signature pointer locations.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SignatureSettings {
    /// Byte address of the begin pointer.
    pub begin: u64,
    /// Byte address of the end pointer.
    pub end: u64,
}

impl Default for SignatureSettings {
    fn default() -> Self {
        let pointers = SignaturePointers::default();
        Self {
            begin: pointers.begin,
            end: pointers.end,
        }
    }
}

impl From<SignatureSettings> for SignaturePointers {
    fn from(s: SignatureSettings) -> Self {
        SignaturePointers {
            begin: s.begin,
            end: s.end,
        }
    }
}

/// Names of the signals the harness drives and observes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalNames {
    /// Clock input.
    pub clk: String,
    /// Reset input.
    pub rst: String,
    /// Whether reset is asserted low.
    pub rst_active_low: bool,
    /// Prefix of the instruction-bus port signals.
    pub ibus: String,
    /// Prefix of the data-bus port signals.
    pub dbus: String,
    /// Prefix of the synchronous instruction RAM signals.
    pub imem: String,
    /// Prefix of the external SRAM signals.
    pub sram: String,
}

impl Default for SignalNames {
    fn default() -> Self {
        Self {
            clk: "clk".into(),
            rst: "rst".into(),
            rst_active_low: false,
            ibus: "ibus_".into(),
            dbus: "dbus_".into(),
            imem: "imem_".into(),
            sram: "sram_".into(),
        }
    }
}

/// Test family of a suite, fixing how completion is detected and how the
/// result is judged.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TestFamily {
    /// Runs for a fixed time, then compares registers with a golden file.
    Sanity,
    /// Signals pass/fail through x1..x3.
    IsaUnit,
    /// Publishes a signature region compared with a reference file.
    ArchCompliance,
    /// Free-running program; runs for a fixed time and always passes.
    Software,
}

impl TestFamily {
    /// Timeout used when neither the suite nor the harness sets one.
    pub fn default_timeout(self) -> SimTime {
        match self {
            TestFamily::Sanity => SimTime::from_us(2),
            TestFamily::IsaUnit => SimTime::from_us(100),
            TestFamily::ArchCompliance => SimTime::from_us(300),
            TestFamily::Software => SimTime::from_us(100),
        }
    }

    /// Reference-file suffix used when the suite does not set one.
    pub fn default_reference_suffix(self) -> Option<&'static str> {
        match self {
            TestFamily::Sanity => Some(".register_golden"),
            TestFamily::ArchCompliance => Some(".reference_output"),
            TestFamily::IsaUnit | TestFamily::Software => None,
        }
    }

    /// Whether tests of this family need a reference file.
    pub fn needs_reference(self) -> bool {
        self.default_reference_suffix().is_some()
    }

    /// Kebab-case name as written in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            TestFamily::Sanity => "sanity",
            TestFamily::IsaUnit => "isa-unit",
            TestFamily::ArchCompliance => "arch-compliance",
            TestFamily::Software => "software",
        }
    }
}

impl std::fmt::Display for TestFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named group of tests sharing a family and file layout.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteConfig {
    /// Test family.
    pub family: TestFamily,
    /// Directory holding program images.
    pub image_dir: String,
    /// Prepended to the test name to form the image file name.
    #[serde(default)]
    pub image_prefix: String,
    /// Appended to the test name to form the image file name.
    #[serde(default = "default_image_suffix")]
    pub image_suffix: String,
    /// Directory holding golden/reference files (defaults to `image_dir`).
    #[serde(default)]
    pub reference_dir: Option<String>,
    /// Appended to the test name to form the reference file name.
    #[serde(default)]
    pub reference_suffix: Option<String>,
    /// Per-suite timeout.
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub timeout: Option<SimTime>,
    /// Run time of fixed-duration families (defaults to the timeout).
    #[serde(default, deserialize_with = "deserialize_opt_duration")]
    pub run_time: Option<SimTime>,
    /// Test names; a single string or a list.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub tests: Vec<String>,
}

impl SuiteConfig {
    /// The suite's timeout, falling back to the harness setting and then to
    /// the family default.
    pub fn effective_timeout(&self, harness: &HarnessSettings) -> SimTime {
        self.timeout
            .or(harness.timeout)
            .unwrap_or_else(|| self.family.default_timeout())
    }
}

fn default_image_suffix() -> String {
    ".verilog".to_string()
}

/// Deserializes a duration string such as `"100ns"`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<SimTime, D::Error>
where
    D: Deserializer<'de>,
{
    struct Duration;

    impl Visitor<'_> for Duration {
        type Value = SimTime;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a duration with a unit, such as \"10ns\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            SimTime::parse_duration(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_str(Duration)
}

fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<SimTime>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration(deserializer).map(Some)
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `tests = "add"` as well as `tests = ["add", "sub"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
