//! Per-test results.

use std::fmt;
use std::path::PathBuf;

use rvbench_mem::LoadSummary;
use rvbench_sim::SimTime;
use rvbench_verify::Verdict;
use serde::Serialize;

use crate::error::HarnessError;

/// Lifecycle state of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestState {
    /// Nothing done yet.
    Idle,
    /// Memories built and the image loaded.
    Loaded,
    /// Reset asserted.
    Reset,
    /// Out of reset, polling for completion.
    Running,
    /// Completion observed, judging the result.
    Verifying,
    /// The result was accepted.
    Passed,
    /// Setup, running or verification failed.
    Failed,
    /// No completion within the time limit.
    TimedOut,
}

impl TestState {
    /// Returns `true` for the three final states.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Reset => "reset",
            Self::Running => "running",
            Self::Verifying => "verifying",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        })
    }
}

/// The outcome of one test run.
#[derive(Debug)]
pub struct TestReport {
    /// Test name.
    pub name: String,
    /// Every state the test went through, starting with `Idle`.
    pub history: Vec<TestState>,
    /// Virtual time elapsed since reset release.
    pub elapsed: SimTime,
    /// What the image load wrote.
    pub load: Option<LoadSummary>,
    /// What verification established, for passed tests.
    pub verdict: Option<Verdict>,
    /// Waveform written during the run.
    pub waveform: Option<PathBuf>,
    /// Why the test did not pass.
    pub error: Option<HarnessError>,
}

impl TestReport {
    /// The final state.
    pub fn state(&self) -> TestState {
        self.history.last().copied().unwrap_or(TestState::Idle)
    }

    /// Returns `true` if the test passed.
    pub fn passed(&self) -> bool {
        self.state() == TestState::Passed
    }

    /// Whether the test went through `state`.
    pub fn visited(&self, state: TestState) -> bool {
        self.history.contains(&state)
    }

    /// One status line in the style of `   PASS  name (elapsed)`.
    pub fn status_line(&self) -> String {
        match (self.state(), &self.error) {
            (TestState::Passed, _) => format!("   PASS  {} ({})", self.name, self.elapsed),
            (TestState::TimedOut, Some(err)) => format!("TIMEOUT  {}: {err}", self.name),
            (_, Some(err)) => format!("   FAIL  {}: {err}", self.name),
            (state, None) => format!("   FAIL  {}: stopped in state {state}", self.name),
        }
    }
}
