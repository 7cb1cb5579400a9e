//! Test resolution: turning a suite entry into concrete files and timing.

use crate::error::ConfigError;
use crate::types::{RvbenchConfig, SuiteConfig, TestFamily};
use rvbench_sim::SimTime;
use std::path::{Path, PathBuf};

/// A single test with every path and duration settled.
///
/// Timeouts fall back from the suite, to the harness, to the family default.
/// Paths are relative to the project directory until [`ResolvedTest::with_root`]
/// anchors them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTest {
    /// The suite name.
    pub suite: String,
    /// The test name.
    pub name: String,
    /// The family of the suite.
    pub family: TestFamily,
    /// Program image to load.
    pub image: PathBuf,
    /// Golden register file or reference signature, if the family uses one.
    pub reference: Option<PathBuf>,
    /// Virtual time after reset release before the test is timed out.
    pub timeout: SimTime,
    /// Run time of fixed-duration families.
    pub run_time: SimTime,
}

impl ResolvedTest {
    /// Qualified `suite/name` identifier used in reports.
    pub fn id(&self) -> String {
        format!("{}/{}", self.suite, self.name)
    }

    /// Anchors relative paths at `root`.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.image = root.join(&self.image);
        self.reference = self.reference.map(|r| root.join(r));
        self
    }
}

/// Resolves one named test of a suite.
pub fn resolve_test(
    config: &RvbenchConfig,
    suite_name: &str,
    test_name: &str,
) -> Result<ResolvedTest, ConfigError> {
    let suite = lookup_suite(config, suite_name)?;
    if !suite.tests.iter().any(|t| t == test_name) {
        return Err(ConfigError::UnknownTest {
            suite: suite_name.to_string(),
            test: test_name.to_string(),
        });
    }
    Ok(build(config, suite_name, suite, test_name))
}

/// Resolves every test of a suite, in listed order.
pub fn resolve_suite(
    config: &RvbenchConfig,
    suite_name: &str,
) -> Result<Vec<ResolvedTest>, ConfigError> {
    let suite = lookup_suite(config, suite_name)?;
    Ok(suite
        .tests
        .iter()
        .map(|t| build(config, suite_name, suite, t))
        .collect())
}

fn lookup_suite<'a>(config: &'a RvbenchConfig, name: &str) -> Result<&'a SuiteConfig, ConfigError> {
    config
        .suites
        .get(name)
        .ok_or_else(|| ConfigError::UnknownSuite(name.to_string()))
}

fn build(config: &RvbenchConfig, suite_name: &str, suite: &SuiteConfig, test: &str) -> ResolvedTest {
    let image = Path::new(&suite.image_dir).join(format!(
        "{}{}{}",
        suite.image_prefix, test, suite.image_suffix
    ));

    let suffix = suite
        .reference_suffix
        .as_deref()
        .or_else(|| suite.family.default_reference_suffix());
    let reference = suffix.map(|suffix| {
        let dir = suite.reference_dir.as_deref().unwrap_or(&suite.image_dir);
        Path::new(dir).join(format!("{}{}{}", suite.image_prefix, test, suffix))
    });

    let timeout = suite.effective_timeout(&config.harness);

    ResolvedTest {
        suite: suite_name.to_string(),
        name: test.to_string(),
        family: suite.family,
        image,
        reference,
        timeout,
        run_time: suite.run_time.unwrap_or(timeout),
    }
}
