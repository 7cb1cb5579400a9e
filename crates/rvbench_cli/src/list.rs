//! `rvbench list` — show the tests configured in `rvbench.toml`.

use std::fmt::Write as _;
use std::path::Path;

use rvbench_config::{resolve_suite, ResolvedTest, RvbenchConfig};
use serde::Serialize;
use tracing::debug;

use crate::project::resolve_project_root;
use crate::{GlobalArgs, ListArgs, ReportFormat};

/// One listed test in JSON output.
#[derive(Debug, Serialize)]
struct ListedTest {
    suite: String,
    name: String,
    family: String,
    image: String,
    reference: Option<String>,
    timeout: String,
}

impl From<&ResolvedTest> for ListedTest {
    fn from(t: &ResolvedTest) -> Self {
        Self {
            suite: t.suite.clone(),
            name: t.name.clone(),
            family: t.family.to_string(),
            image: t.image.display().to_string(),
            reference: t.reference.as_ref().map(|r| r.display().to_string()),
            timeout: t.timeout.to_string(),
        }
    }
}

/// Runs the `rvbench list` command.
pub fn run(args: &ListArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let root = resolve_project_root(global)?;
    let config = rvbench_config::load_config(&root)?;
    let tests = collect(&config, args.suite.as_deref(), &root)?;
    debug!(root = %root.display(), tests = tests.len(), "resolved tests");

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                eprintln!("   Listing {} ({} test(s))", config.project.name, tests.len());
            }
            print!("{}", render_text(&tests));
        }
        ReportFormat::Json => {
            let listed: Vec<ListedTest> = tests.iter().map(ListedTest::from).collect();
            println!("{}", serde_json::to_string_pretty(&listed)?);
        }
    }
    Ok(0)
}

fn collect(
    config: &RvbenchConfig,
    suite: Option<&str>,
    root: &Path,
) -> Result<Vec<ResolvedTest>, rvbench_config::ConfigError> {
    let names: Vec<&str> = match suite {
        Some(name) => vec![name],
        None => config.suites.keys().map(String::as_str).collect(),
    };
    let mut tests = Vec::new();
    for name in names {
        tests.extend(
            resolve_suite(config, name)?
                .into_iter()
                .map(|t| t.with_root(root)),
        );
    }
    Ok(tests)
}

fn render_text(tests: &[ResolvedTest]) -> String {
    let width = tests.iter().map(|t| t.id().len()).max().unwrap_or(0);
    let mut out = String::new();
    for t in tests {
        let _ = writeln!(
            out,
            "{:<width$}  {:<15}  {:>8}  {}",
            t.id(),
            t.family.as_str(),
            t.timeout.to_string(),
            t.image.display()
        );
    }
    out
}
