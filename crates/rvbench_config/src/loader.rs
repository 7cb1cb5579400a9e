//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::RvbenchConfig;
use rvbench_sim::SimTime;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "rvbench.toml";

/// Loads and validates an `rvbench.toml` configuration from a project directory.
///
/// Reads `<project_dir>/rvbench.toml`, parses it, and validates it.
pub fn load_config(project_dir: &Path) -> Result<RvbenchConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates an `rvbench.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<RvbenchConfig, ConfigError> {
    let config: RvbenchConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &RvbenchConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }

    let harness = &config.harness;
    let period = harness.clock_period.fs;
    if period < 2 || period % 2 != 0 {
        return Err(ConfigError::ValidationError(format!(
            "harness.clock_period must be an even, non-zero number of femtoseconds (got {})",
            harness.clock_period
        )));
    }
    if harness.poll_interval == SimTime::ZERO {
        return Err(ConfigError::ValidationError(
            "harness.poll_interval must be positive".to_string(),
        ));
    }
    if harness.timeout == Some(SimTime::ZERO) {
        return Err(ConfigError::ValidationError(
            "harness.timeout must be positive".to_string(),
        ));
    }

    let memory = &config.memory;
    if memory.addr_width == 0 || memory.addr_width > 64 {
        return Err(ConfigError::ValidationError(format!(
            "memory.addr_width must be between 1 and 64 (got {})",
            memory.addr_width
        )));
    }
    if memory.addr_width < 64 && memory.clear_words > (1u64 << memory.addr_width) {
        return Err(ConfigError::ValidationError(format!(
            "memory.clear_words ({}) exceeds the {}-bit address space",
            memory.clear_words, memory.addr_width
        )));
    }

    let signature = &config.signature;
    if signature.begin % 4 != 0 || signature.end % 4 != 0 {
        return Err(ConfigError::ValidationError(
            "signature pointers must be 4-byte aligned".to_string(),
        ));
    }
    if signature.begin == signature.end {
        return Err(ConfigError::ValidationError(
            "signature.begin and signature.end must differ".to_string(),
        ));
    }

    for (name, suite) in &config.suites {
        if suite.image_dir.is_empty() {
            return Err(ConfigError::MissingField(format!("suites.{name}.image_dir")));
        }
        if suite.tests.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "suite '{name}' lists no tests"
            )));
        }
        if let Some(dup) = first_duplicate(&suite.tests) {
            return Err(ConfigError::ValidationError(format!(
                "suite '{name}' lists test '{dup}' twice"
            )));
        }
        if suite.timeout == Some(SimTime::ZERO) {
            return Err(ConfigError::ValidationError(format!(
                "suites.{name}.timeout must be positive"
            )));
        }
        let timeout = suite.effective_timeout(&config.harness);
        if let Some(run_time) = suite.run_time.filter(|&r| r > timeout) {
            return Err(ConfigError::ValidationError(format!(
                "suites.{name}.run_time ({run_time}) exceeds the timeout ({timeout})"
            )));
        }
    }
    Ok(())
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .find(|n| !seen.insert(n.as_str()))
        .map(String::as_str)
}
