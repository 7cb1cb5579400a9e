//! Running every test of a suite.

use rvbench_config::ResolvedTest;
use rvbench_sim::SimTarget;
use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::family::TestCase;
use crate::orchestrator::TestOrchestrator;
use crate::report::{TestReport, TestState};

/// Aggregate outcome of a suite run.
#[derive(Debug, Default)]
pub struct SuiteSummary {
    /// Per-test reports, in run order.
    pub reports: Vec<TestReport>,
}

impl SuiteSummary {
    /// Number of passed tests.
    pub fn passed(&self) -> usize {
        self.count(TestState::Passed)
    }

    /// Number of failed tests.
    pub fn failed(&self) -> usize {
        self.count(TestState::Failed)
    }

    /// Number of timed-out tests.
    pub fn timed_out(&self) -> usize {
        self.count(TestState::TimedOut)
    }

    /// Returns `true` if every test passed.
    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(TestReport::passed)
    }

    fn count(&self, state: TestState) -> usize {
        self.reports.iter().filter(|r| r.state() == state).count()
    }
}

/// Runs `tests` in order, each against a fresh target from `factory`.
///
/// A test whose case or target cannot be built is reported as failed and
/// the suite carries on.
pub fn run_suite<F>(config: &HarnessConfig, tests: &[ResolvedTest], mut factory: F) -> SuiteSummary
where
    F: FnMut(&ResolvedTest) -> Result<Box<dyn SimTarget>, HarnessError>,
{
    let mut summary = SuiteSummary::default();
    for test in tests {
        let report = match TestCase::for_family(test, config)
            .and_then(|case| Ok((case, factory(test)?)))
        {
            Ok((case, mut target)) => {
                TestOrchestrator::new(config.clone(), case).run(target.as_mut())
            }
            Err(err) => {
                warn!(test = %test.id(), error = %err, "could not start test");
                TestReport {
                    name: test.id(),
                    history: vec![TestState::Idle, TestState::Failed],
                    elapsed: Default::default(),
                    load: None,
                    verdict: None,
                    waveform: None,
                    error: Some(err),
                }
            }
        };
        summary.reports.push(report);
    }
    info!(
        passed = summary.passed(),
        failed = summary.failed(),
        timed_out = summary.timed_out(),
        "suite finished"
    );
    summary
}
