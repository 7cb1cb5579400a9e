//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating an `rvbench.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A referenced suite does not exist in the configuration.
    #[error("unknown suite '{0}'")]
    UnknownSuite(String),

    /// A referenced test is not listed in its suite.
    #[error("unknown test '{test}' in suite '{suite}'")]
    UnknownTest {
        /// Suite name.
        suite: String,
        /// Test name.
        test: String,
    },

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_suite() {
        let err = ConfigError::UnknownSuite("nonexistent".to_string());
        assert_eq!(format!("{err}"), "unknown suite 'nonexistent'");
    }

    #[test]
    fn display_unknown_test() {
        let err = ConfigError::UnknownTest {
            suite: "isa".into(),
            test: "fence_i".into(),
        };
        assert_eq!(format!("{err}"), "unknown test 'fence_i' in suite 'isa'");
    }

    #[test]
    fn display_missing_field() {
        let err = ConfigError::MissingField("project.name".to_string());
        assert_eq!(format!("{err}"), "missing required field: project.name");
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::IoError(io_err);
        assert!(format!("{err}").starts_with("failed to read configuration:"));
    }
}
