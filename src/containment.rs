//! Error containment policy.
//!
//! Components return plain `Result`s. The policy is applied once, at the
//! public boundary of an operation, so a single failure produces a single
//! diagnostic entry no matter how deep it was detected.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diagnostics::DiagnosticLog;
use crate::error::Result;

/// What a public operation does with a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    /// Hand the error to the caller unchanged.
    Propagate,
    /// Record the error and report "no result".
    #[default]
    Suppress,
}

impl Containment {
    /// Apply the policy to the outcome of `step`.
    ///
    /// Under `Suppress` an error is logged, appended to `log` when one is
    /// configured, and replaced by `Ok(None)`.
    pub fn contain<T>(
        self,
        step: &str,
        log: Option<&DiagnosticLog>,
        outcome: Result<Option<T>>,
    ) -> Result<Option<T>> {
        match (self, outcome) {
            (Self::Suppress, Err(e)) => {
                warn!("{} failed, suppressing: {}", step, e);
                if let Some(log) = log {
                    log.record(&e);
                }
                Ok(None)
            }
            (_, outcome) => outcome,
        }
    }

    #[must_use]
    pub fn is_suppress(self) -> bool {
        self == Self::Suppress
    }
}
