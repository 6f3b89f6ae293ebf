//! Failure taxonomy for a run.
//!
//! Every step-level function returns one of these classified variants; the
//! top-level loop matches on the class to decide logging depth and exit
//! behavior. The only non-fatal case, a timed-out reload after the extend
//! click, is modeled as an outcome variant in the session rather than as an
//! error that gets caught and downgraded.

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Bad or missing credentials. Fatal, never retried.
    #[error("{0}")]
    Configuration(String),

    /// A navigation or element wait exceeded the budget.
    #[error("Timed out {action} after {} s", budget.as_secs_f64())]
    Timeout { action: String, budget: Duration },

    /// An expected control is absent or disabled. Signals markup drift or an
    /// account-state mismatch.
    #[error("{message} (selector: {selector})")]
    Element { selector: String, message: String },

    /// Browser engine missing or unlaunchable, after one install attempt.
    #[error("Unable to provision {browser} browser")]
    Provisioner {
        browser: String,
        #[source]
        source: BoxError,
    },

    /// Navigation failed for a reason other than the budget.
    #[error("Unable to load {url}")]
    Navigation {
        url: String,
        #[source]
        source: BoxError,
    },

    /// User interrupt; mapped to exit code 130.
    #[error("Interrupted by user")]
    Interrupted,

    /// Catch-all for unclassified failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RunError {
    pub fn timeout(action: impl Into<String>, budget: Duration) -> Self {
        Self::Timeout {
            action: action.into(),
            budget,
        }
    }

    pub fn element(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Element {
            selector: selector.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::Timeout { .. })
    }
}
