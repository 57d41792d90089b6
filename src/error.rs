//! Error taxonomy for the control core
//!
//! Only `Configuration` is meant to surface to the host. The other classes are
//! recovered where they occur or at the `MetaController::tick` boundary.

use thiserror::Error;

/// Errors raised by control components
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// Non-finite or out-of-domain input
    #[error("Invalid input for {field}: {value}")]
    InvalidInput {
        /// Name of the rejected argument
        field: &'static str,
        /// Rejected value
        value: f64,
    },
    /// Internal numerical collapse
    #[error("Degenerate state in {component}: {reason}")]
    DegenerateState {
        /// Component that detected the collapse
        component: &'static str,
        /// What collapsed
        reason: String,
    },
    /// Unexpected failure inside a sub-component
    #[error("Upstream failure in {component}: {reason}")]
    UpstreamFailure {
        /// Component that failed
        component: &'static str,
        /// Failure description
        reason: String,
    },
    /// Invalid construction-time parameter
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ControlError {
    /// Reject a non-finite or out-of-domain value
    pub fn invalid_input(field: &'static str, value: f64) -> Self {
        Self::InvalidInput { field, value }
    }

    /// Report a numerical collapse
    pub fn degenerate(component: &'static str, reason: impl Into<String>) -> Self {
        Self::DegenerateState {
            component,
            reason: reason.into(),
        }
    }

    /// Report a sub-component failure
    pub fn upstream(component: &'static str, reason: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            component,
            reason: reason.into(),
        }
    }

    /// Report an invalid configuration parameter
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }
}

/// Reject non-finite values
pub(crate) fn ensure_finite(field: &'static str, value: f64) -> Result<f64, ControlError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ControlError::invalid_input(field, value))
    }
}
