use std::fmt;
use std::sync::Arc;

use crate::BoxError;

/// Process exit code shared by every failure path.
pub const EXIT_FAILURE: u8 = 1;

/// Configuration rejected before any application is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No input file was given (or it was empty).
    MissingInput,
    /// The forwarder control URI was set to an empty string.
    EmptyForwarderUri,
    /// The forwarder control URI is not an absolute `http://` URI.
    InvalidForwarderUri(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingInput => write!(f, "missing required -input file"),
            ConfigError::EmptyForwarderUri => write!(f, "empty -gqlserver value"),
            ConfigError::InvalidForwarderUri(uri) => {
                write!(f, "invalid -gqlserver value {uri:?}, expected http://host:port/")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Failure at one stage of the application lifecycle.
#[derive(Debug)]
pub enum LifecycleError {
    /// Application construction failed.
    Init(BoxError),
    /// The blocking run operation returned an error.
    Run(BoxError),
    /// Closing the application failed. Always fatal.
    Cleanup(Arc<dyn std::error::Error + Send + Sync>),
}

impl LifecycleError {
    /// Every lifecycle failure maps to the same exit code.
    pub fn exit_code(&self) -> u8 {
        EXIT_FAILURE
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Init(e) => write!(f, "init error: {e}"),
            LifecycleError::Run(e) => write!(f, "run error: {e}"),
            LifecycleError::Cleanup(e) => write!(f, "close error: {e}"),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Init(e) | LifecycleError::Run(e) => Some(&**e),
            LifecycleError::Cleanup(e) => Some(&**e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exit_code_is_uniform() {
        let errors = [
            LifecycleError::Init("no face".into()),
            LifecycleError::Run("lost face".into()),
            LifecycleError::Cleanup(Arc::from(BoxError::from("busy"))),
        ];
        for e in &errors {
            assert_eq!(e.exit_code(), EXIT_FAILURE);
            assert!(e.source().is_some());
        }
    }

    #[test]
    fn test_display_carries_stage() {
        let e = LifecycleError::Run("lost face".into());
        assert_eq!(e.to_string(), "run error: lost face");
        assert_eq!(
            ConfigError::MissingInput.to_string(),
            "missing required -input file"
        );
    }
}
