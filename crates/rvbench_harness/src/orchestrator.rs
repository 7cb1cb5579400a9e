//! The per-test state machine.
//!
//! ```text
//! Idle → Loaded → Reset → Running → Verifying → Passed
//!                            │           └────→ Failed
//!                            ├─→ Failed
//!                            └─→ TimedOut
//! ```
//!
//! The orchestrator owns the memory models for exactly one run: they are
//! built in `Idle`, lent to the kernel on every advance, and dropped when
//! the run ends, whatever the outcome.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use rvbench_common::LogicVec;
use rvbench_sim::{ClockEdge, SignalHandle, SimKernel, SimTarget, SimTime, VcdRecorder};
use rvbench_verify::{Completion, Probe};
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::family::TestCase;
use crate::report::{TestReport, TestState};
use crate::topology::MemorySystem;

/// Delay between the rising edge that ends reset and reset release.
const RESET_RELEASE_DELAY: SimTime = SimTime::from_ns(1);

/// Drives one test through load, reset, run and verification.
pub struct TestOrchestrator {
    config: HarnessConfig,
    case: TestCase,
    history: Vec<TestState>,
}

/// What a finished run produced besides its outcome.
struct RunArtifacts {
    elapsed: SimTime,
    load: Option<rvbench_mem::LoadSummary>,
    waveform: Option<PathBuf>,
}

impl TestOrchestrator {
    /// Creates an orchestrator in the `Idle` state.
    pub fn new(config: HarnessConfig, case: TestCase) -> Self {
        Self {
            config,
            case,
            history: vec![TestState::Idle],
        }
    }

    /// The current state.
    pub fn state(&self) -> TestState {
        self.history.last().copied().unwrap_or(TestState::Idle)
    }

    /// The test being run.
    pub fn case(&self) -> &TestCase {
        &self.case
    }

    /// Runs the test, folding every failure into the report.
    pub fn run(&mut self, target: &mut dyn SimTarget) -> TestReport {
        match self.execute(target) {
            Ok(report) => report,
            Err(err) => {
                warn!(test = %self.case.name, state = %self.state(), error = %err, "test setup failed");
                self.enter(TestState::Failed);
                self.report(
                    RunArtifacts {
                        elapsed: SimTime::ZERO,
                        load: None,
                        waveform: None,
                    },
                    Err(err),
                )
            }
        }
    }

    /// Runs the test.
    ///
    /// Failures before the design leaves reset (missing signals, unreadable
    /// image, unusable clock) are returned as errors. Once the design runs,
    /// every outcome is a report.
    pub fn execute(&mut self, target: &mut dyn SimTarget) -> Result<TestReport, HarnessError> {
        self.history = vec![TestState::Idle];
        if self.config.poll_interval == SimTime::ZERO {
            return Err(HarnessError::Setup("poll interval must be non-zero".into()));
        }
        let signals = &self.config.signals;
        let clk = target.resolve(&signals.clk)?;
        let rst = target.resolve(&signals.rst)?;

        let mut memory = MemorySystem::build(target, &self.config)?;
        let load = memory.load(&self.case.image, self.config.memory.clear_words)?;
        self.enter(TestState::Loaded);

        let mut kernel = SimKernel::new(target, clk, self.config.clock_period)?;
        let waveform = if self.config.waveform {
            Some(self.start_waveform(&mut kernel, target, &memory, &[clk, rst])?)
        } else {
            None
        };

        self.enter(TestState::Reset);
        self.reset(&mut kernel, target, &mut memory, rst)?;
        let released = kernel.current_time();
        self.enter(TestState::Running);

        let outcome = self
            .wait_for_completion(&mut kernel, target, &mut memory, released)
            .and_then(|completion| {
                self.enter(TestState::Verifying);
                let probe = Probe::new(&*target, Some(memory.data_memory()), self.config.undefined);
                Ok(self.case.verifier.verify(&probe, &completion)?)
            });
        let elapsed = kernel.current_time() - released;
        if let Err(err) = kernel.finish() {
            warn!(test = %self.case.name, error = %err, "failed to finish waveform");
        }

        match &outcome {
            Ok(_) => self.enter(TestState::Passed),
            Err(HarnessError::Timeout { .. }) => self.enter(TestState::TimedOut),
            Err(_) => self.enter(TestState::Failed),
        }
        Ok(self.report(
            RunArtifacts {
                elapsed,
                load: Some(load),
                waveform,
            },
            outcome,
        ))
    }

    fn enter(&mut self, next: TestState) {
        debug!(test = %self.case.name, from = %self.state(), to = %next, "state transition");
        self.history.push(next);
    }

    /// Holds reset for the settle time, then releases it shortly after the
    /// next rising edge.
    fn reset(
        &self,
        kernel: &mut SimKernel,
        target: &mut dyn SimTarget,
        memory: &mut MemorySystem,
        rst: SignalHandle,
    ) -> Result<(), HarnessError> {
        let asserted = !self.config.signals.rst_active_low;
        kernel.drive(target, rst, LogicVec::from_bool(asserted))?;
        kernel.run_for(target, memory, self.config.reset_settle)?;
        let edge = kernel.run_until_edge(target, memory, ClockEdge::Rising)?;
        let release = edge + RESET_RELEASE_DELAY;
        kernel.schedule_event(release, rst, LogicVec::from_bool(!asserted));
        kernel.advance(target, memory, release)?;
        debug!(test = %self.case.name, at = %release, "reset released");
        Ok(())
    }

    /// Advances in poll-interval steps until the strategy reports completion
    /// or the timeout is reached. The strategy is polled before the timeout
    /// is checked, so completion at exactly the limit still counts.
    fn wait_for_completion(
        &mut self,
        kernel: &mut SimKernel,
        target: &mut dyn SimTarget,
        memory: &mut MemorySystem,
        released: SimTime,
    ) -> Result<Completion, HarnessError> {
        let limit = self.case.timeout;
        let deadline = released + limit;
        loop {
            let remaining = deadline - kernel.current_time();
            let step = if remaining == SimTime::ZERO {
                self.config.poll_interval
            } else {
                self.config.poll_interval.min(remaining)
            };
            kernel.run_for(target, memory, step)?;
            let elapsed = kernel.current_time() - released;

            let probe = Probe::new(&*target, Some(memory.data_memory()), self.config.undefined);
            let completion = self.case.strategy.poll(&probe, elapsed)?;
            if completion.completed {
                info!(
                    test = %self.case.name,
                    strategy = self.case.strategy.kind(),
                    %elapsed,
                    "completion observed"
                );
                return Ok(completion);
            }
            if elapsed >= limit {
                return Err(HarnessError::Timeout {
                    limit,
                    elapsed,
                    observation: self.case.strategy.last_observation(),
                });
            }
        }
    }

    fn start_waveform(
        &self,
        kernel: &mut SimKernel,
        target: &dyn SimTarget,
        memory: &MemorySystem,
        control: &[SignalHandle],
    ) -> Result<PathBuf, HarnessError> {
        let path = self.config.output_dir.join(format!("{}.vcd", self.case.name));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let recorder = VcdRecorder::new(BufWriter::new(File::create(&path)?));
        let mut signals = control.to_vec();
        signals.extend(memory.traced_signals());
        kernel.trace(target, Box::new(recorder), &signals)?;
        info!(test = %self.case.name, path = %path.display(), "recording waveform");
        Ok(path)
    }

    fn report(
        &self,
        artifacts: RunArtifacts,
        outcome: Result<rvbench_verify::Verdict, HarnessError>,
    ) -> TestReport {
        let (verdict, error) = match outcome {
            Ok(verdict) => {
                info!(test = %self.case.name, summary = %verdict.summary, "test passed");
                (Some(verdict), None)
            }
            Err(err) => {
                warn!(test = %self.case.name, state = %self.state(), error = %err, "test did not pass");
                (None, Some(err))
            }
        };
        TestReport {
            name: self.case.name.clone(),
            history: self.history.clone(),
            elapsed: artifacts.elapsed,
            load: artifacts.load,
            verdict,
            waveform: artifacts.waveform,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Board;
    use rvbench_mem::MemError;
    use rvbench_verify::{
        CompletionStrategy, GoldenRecord, GoldenRegisterFileVerifier, ResultVerifier, VerifyError,
    };
    use std::path::Path;
    use tempfile::TempDir;

    fn image(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("prog.verilog");
        fs::write(&path, "@00000000\n13 00 00 00\n").unwrap();
        path
    }

    fn isa_case(image: &Path, timeout: SimTime) -> TestCase {
        TestCase::new(
            "isa/add",
            image,
            timeout,
            CompletionStrategy::register_pattern(),
            ResultVerifier::PassFail,
        )
    }

    fn golden_case(image: &Path, golden: &str) -> TestCase {
        TestCase::new(
            "sanity/add",
            image,
            SimTime::from_us(2),
            CompletionStrategy::fixed(SimTime::from_us(2)),
            ResultVerifier::GoldenRegisters(GoldenRegisterFileVerifier {
                record: GoldenRecord::parse_str(golden).unwrap(),
            }),
        )
    }

    const FULL: [TestState; 6] = [
        TestState::Idle,
        TestState::Loaded,
        TestState::Reset,
        TestState::Running,
        TestState::Verifying,
        TestState::Passed,
    ];

    #[test]
    fn register_pattern_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new()
            .at(50, 1, Some(1))
            .at(50, 2, Some(2))
            .at(50, 3, Some(3));
        let mut orch = TestOrchestrator::new(
            HarnessConfig::default(),
            isa_case(&image(&dir), SimTime::from_us(100)),
        );
        let report = orch.run(&mut board);
        assert!(report.passed(), "{}", report.status_line());
        assert_eq!(report.history, FULL);
        assert_eq!(report.elapsed, SimTime::from_ns(500));
        assert_eq!(report.load.unwrap().words, 1);
        assert_eq!(orch.state(), TestState::Passed);
    }

    #[test]
    fn fail_pattern_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new()
            .at(5, 1, Some(0xF))
            .at(5, 2, Some(0xF))
            .at(5, 3, Some(0xF));
        let report = TestOrchestrator::new(
            HarnessConfig::default(),
            isa_case(&image(&dir), SimTime::from_us(100)),
        )
        .run(&mut board);
        assert_eq!(report.state(), TestState::Failed);
        assert!(!report.visited(TestState::Verifying));
        assert!(matches!(
            report.error,
            Some(HarnessError::Verify(VerifyError::FailPattern { .. }))
        ));
        assert_eq!(report.elapsed, SimTime::from_ns(100));
    }

    #[test]
    fn timeout_skips_verification() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new();
        let report = TestOrchestrator::new(
            HarnessConfig::default(),
            isa_case(&image(&dir), SimTime::from_ns(1050)),
        )
        .run(&mut board);
        assert_eq!(report.state(), TestState::TimedOut);
        assert!(!report.visited(TestState::Verifying));
        assert_eq!(report.elapsed, SimTime::from_ns(1050));
        match report.error {
            Some(HarnessError::Timeout { observation, .. }) => {
                assert_eq!(observation.unwrap(), "x1 = 0x0, x2 = 0x0, x3 = 0x0");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn zero_poll_interval_is_setup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new();
        let config = HarnessConfig {
            poll_interval: SimTime::ZERO,
            ..HarnessConfig::default()
        };
        let report = TestOrchestrator::new(config, isa_case(&image(&dir), SimTime::from_us(1)))
            .run(&mut board);
        assert_eq!(report.history, vec![TestState::Idle, TestState::Failed]);
        assert!(matches!(report.error, Some(HarnessError::Setup(_))));
        assert_eq!(board.cycles(), 0);
    }

    #[test]
    fn golden_registers_after_fixed_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new().at(3, 1, Some(0xDEAD_BEEF));
        let report = TestOrchestrator::new(
            HarnessConfig::default(),
            golden_case(&image(&dir), "ra (x1)\n0xdeadbeef\n"),
        )
        .run(&mut board);
        assert!(report.passed(), "{}", report.status_line());
        assert_eq!(report.elapsed, SimTime::from_us(2));
        assert_eq!(report.verdict.unwrap().checked, vec![1]);
    }

    #[test]
    fn golden_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new().at(3, 1, Some(0x1234));
        let report = TestOrchestrator::new(
            HarnessConfig::default(),
            golden_case(&image(&dir), "ra (x1)\n0xdeadbeef\n"),
        )
        .run(&mut board);
        assert_eq!(report.state(), TestState::Failed);
        assert!(report.visited(TestState::Verifying));
        let message = report.error.unwrap().to_string();
        assert_eq!(
            message,
            "register x1 (ra): expected 0xdeadbeef, actual 0x00001234"
        );
    }

    #[test]
    fn undefined_register_follows_policy() {
        let dir = tempfile::tempdir().unwrap();
        let image = image(&dir);
        let case = golden_case(&image, "tp (x4)\n0x0\n");

        let mut board = Board::new().at(1, 4, None);
        let strict = TestOrchestrator::new(HarnessConfig::default(), case.clone()).run(&mut board);
        assert!(matches!(
            strict.error,
            Some(HarnessError::Verify(VerifyError::UndefinedRegister { index: 4 }))
        ));

        let mut board = Board::new().at(1, 4, None);
        let config = HarnessConfig {
            undefined: rvbench_verify::UndefinedPolicy::Zero,
            ..HarnessConfig::default()
        };
        assert!(TestOrchestrator::new(config, case).run(&mut board).passed());
    }

    #[test]
    fn reset_held_then_released() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new();
        let case = TestCase::new(
            "sw/idle",
            image(&dir),
            SimTime::from_us(1),
            CompletionStrategy::fixed(SimTime::from_us(1)),
            ResultVerifier::None,
        );
        let report = TestOrchestrator::new(HarnessConfig::default(), case).run(&mut board);
        assert!(report.passed());
        // Released at 56 ns; rising edges at 65, 75, ... up to 1056 ns.
        assert_eq!(board.cycles(), 100);
        let rst = board.resolve("rst").unwrap();
        assert_eq!(board.read_u64(rst).unwrap(), Some(0));
    }

    #[test]
    fn missing_image_is_setup_failure() {
        let mut board = Board::new();
        let case = isa_case(Path::new("/nonexistent/prog.verilog"), SimTime::from_us(1));
        let mut orch = TestOrchestrator::new(HarnessConfig::default(), case.clone());
        let report = orch.run(&mut board);
        assert_eq!(report.history, vec![TestState::Idle, TestState::Failed]);
        assert_eq!(report.elapsed, SimTime::ZERO);

        let err = TestOrchestrator::new(HarnessConfig::default(), case)
            .execute(&mut board)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Mem(MemError::Open { .. })));
    }

    #[test]
    fn missing_clock_is_setup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::without("clk");
        let err = TestOrchestrator::new(
            HarnessConfig::default(),
            isa_case(&image(&dir), SimTime::from_us(1)),
        )
        .execute(&mut board)
        .unwrap_err();
        assert_eq!(err.to_string(), "unknown signal 'clk'");
    }

    #[test]
    fn waveform_written_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::new();
        let config = HarnessConfig {
            waveform: true,
            output_dir: dir.path().join("out"),
            ..HarnessConfig::default()
        };
        let case = TestCase::new(
            "sw/blink",
            image(&dir),
            SimTime::from_ns(200),
            CompletionStrategy::fixed(SimTime::from_ns(200)),
            ResultVerifier::None,
        );
        let report = TestOrchestrator::new(config, case).run(&mut board);
        let path = report.waveform.unwrap();
        assert_eq!(path, dir.path().join("out/sw/blink.vcd"));
        let vcd = fs::read_to_string(path).unwrap();
        assert!(vcd.contains("$timescale"));
        assert!(vcd.contains("dbus_haddr"));
    }
}
