//! Test cases: a program image plus how its end is detected and judged.

use std::path::{Path, PathBuf};

use rvbench_config::{ResolvedTest, TestFamily};
use rvbench_sim::SimTime;
use rvbench_verify::{
    CompletionStrategy, GoldenRecord, GoldenRegisterFileVerifier, ResultVerifier,
    SignatureFileVerifier,
};

use crate::config::HarnessConfig;
use crate::error::HarnessError;

/// A single runnable test.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Name used in logs and reports.
    pub name: String,
    /// Program image.
    pub image: PathBuf,
    /// Virtual time after reset release before the test times out.
    pub timeout: SimTime,
    /// Completion detection.
    pub strategy: CompletionStrategy,
    /// Result verification.
    pub verifier: ResultVerifier,
}

impl TestCase {
    /// Creates a test from explicit parts.
    pub fn new(
        name: impl Into<String>,
        image: impl Into<PathBuf>,
        timeout: SimTime,
        strategy: CompletionStrategy,
        verifier: ResultVerifier,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            timeout,
            strategy,
            verifier,
        }
    }

    /// Wires the completion strategy and verifier of the test's family.
    ///
    /// | family | completion | verification |
    /// |---|---|---|
    /// | sanity | fixed run time | golden registers |
    /// | isa-unit | register pattern | pass/fail |
    /// | arch-compliance | signature pointers | reference signature |
    /// | software | fixed run time | none |
    ///
    /// Golden files are parsed here, so a malformed one fails before the
    /// design is touched.
    pub fn for_family(test: &ResolvedTest, config: &HarnessConfig) -> Result<Self, HarnessError> {
        let (strategy, verifier) = match test.family {
            TestFamily::Sanity => {
                let record = GoldenRecord::from_file(reference(test)?)?;
                (
                    CompletionStrategy::fixed(test.run_time),
                    ResultVerifier::GoldenRegisters(GoldenRegisterFileVerifier { record }),
                )
            }
            TestFamily::IsaUnit => (CompletionStrategy::register_pattern(), ResultVerifier::PassFail),
            TestFamily::ArchCompliance => (
                CompletionStrategy::signature_region(config.signature),
                ResultVerifier::SignatureFile(SignatureFileVerifier {
                    pointers: config.signature,
                    artifact: config
                        .output_dir
                        .join(&test.suite)
                        .join(format!("{}.signature", test.name)),
                    reference: reference(test)?.to_path_buf(),
                }),
            ),
            TestFamily::Software => (CompletionStrategy::fixed(test.run_time), ResultVerifier::None),
        };
        Ok(Self {
            name: test.id(),
            image: test.image.clone(),
            timeout: test.timeout,
            strategy,
            verifier,
        })
    }
}

fn reference(test: &ResolvedTest) -> Result<&Path, HarnessError> {
    test.reference.as_deref().ok_or_else(|| {
        HarnessError::Setup(format!(
            "{} test '{}' has no reference file",
            test.family,
            test.id()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolved(family: TestFamily, reference: Option<PathBuf>) -> ResolvedTest {
        ResolvedTest {
            suite: "s".into(),
            name: "t".into(),
            family,
            image: PathBuf::from("t.verilog"),
            reference,
            timeout: family.default_timeout(),
            run_time: family.default_timeout(),
        }
    }

    #[test]
    fn sanity_parses_golden_file() {
        let dir = tempfile::tempdir().unwrap();
        let golden = dir.path().join("t.register_golden");
        fs::write(&golden, "ra (x1)\n0xdeadbeef\n").unwrap();
        let case = TestCase::for_family(
            &resolved(TestFamily::Sanity, Some(golden)),
            &HarnessConfig::default(),
        )
        .unwrap();
        assert_eq!(case.strategy.kind(), "fixed-quiescence");
        assert_eq!(case.verifier.kind(), "golden-registers");
        assert_eq!(case.name, "s/t");
    }

    #[test]
    fn sanity_missing_golden_file() {
        let err = TestCase::for_family(
            &resolved(TestFamily::Sanity, Some(PathBuf::from("/nonexistent/g"))),
            &HarnessConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::Verify(_)));
    }

    #[test]
    fn isa_and_software() {
        let config = HarnessConfig::default();
        let isa = TestCase::for_family(&resolved(TestFamily::IsaUnit, None), &config).unwrap();
        assert_eq!(isa.strategy.kind(), "register-pattern");
        assert_eq!(isa.verifier, ResultVerifier::PassFail);
        let sw = TestCase::for_family(&resolved(TestFamily::Software, None), &config).unwrap();
        assert_eq!(sw.verifier, ResultVerifier::None);
        assert_eq!(sw.timeout, SimTime::from_us(100));
    }

    #[test]
    fn arch_artifact_under_output_dir() {
        let config = HarnessConfig {
            output_dir: PathBuf::from("/out"),
            ..HarnessConfig::default()
        };
        let case = TestCase::for_family(
            &resolved(TestFamily::ArchCompliance, Some(PathBuf::from("t.ref"))),
            &config,
        )
        .unwrap();
        match case.verifier {
            ResultVerifier::SignatureFile(v) => {
                assert_eq!(v.artifact, PathBuf::from("/out/s/t.signature"));
                assert_eq!(v.reference, PathBuf::from("t.ref"));
            }
            other => panic!("unexpected verifier {}", other.kind()),
        }
    }

    #[test]
    fn arch_without_reference() {
        let err = TestCase::for_family(
            &resolved(TestFamily::ArchCompliance, None),
            &HarnessConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("no reference file"));
    }
}
