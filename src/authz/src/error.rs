//! Error types for the binding engine

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Binding engine errors
#[derive(Debug, Error)]
pub enum BindingError {
    /// Request omitted the policy identifier
    #[error("must specify policyID")]
    MissingPolicyReference,

    /// Policy not found
    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    /// No binding record exists for the (project, policy) pair
    #[error("Project policy binding not found: {0}")]
    BindingNotFound(String),

    /// Identity not found
    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    /// Policy scope is incompatible with the operation
    #[error("unable to bind subject to {scope}-scoped policy {policy} in project")]
    ScopeMismatch { policy: String, scope: String },

    /// Concurrent modification reported by the store
    #[error("Store conflict: {0}")]
    StoreConflict(String),

    /// One or more per-policy bind/unbind calls failed
    #[error("{0}")]
    PartialSyncFailure(SyncFailures),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Evaluator error
    #[error("Evaluator error: {0}")]
    Evaluator(String),

    /// Any other storage failure
    #[error("Store error: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for BindingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => BindingError::StoreConflict(msg),
            other => BindingError::Store(other),
        }
    }
}

/// Result type for binding operations
pub type Result<T> = std::result::Result<T, BindingError>;

/// Which half of a sync produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Bind,
    Unbind,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncPhase::Bind => write!(f, "bind"),
            SyncPhase::Unbind => write!(f, "unbind"),
        }
    }
}

/// A single failed policy-level bind or unbind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub policy_id: String,
    pub phase: SyncPhase,
    pub message: String,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} policy {} failed: {}", self.phase, self.policy_id, self.message)
    }
}

/// Aggregate of every failure produced by one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncFailures {
    failures: Vec<SyncFailure>,
}

impl SyncFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, policy_id: impl Into<String>, phase: SyncPhase, err: &BindingError) {
        self.failures.push(SyncFailure {
            policy_id: policy_id.into(),
            phase,
            message: err.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SyncFailure> {
        self.failures.iter()
    }

    /// Failures of one phase only
    pub fn in_phase(&self, phase: SyncPhase) -> impl Iterator<Item = &SyncFailure> {
        self.failures.iter().filter(move |f| f.phase == phase)
    }

    /// `Ok(())` when nothing failed, otherwise the aggregate error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BindingError::PartialSyncFailure(self))
        }
    }
}

impl fmt::Display for SyncFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => write!(f, "no sync failures"),
            [only] => write!(f, "{}", only),
            many => {
                write!(f, "[")?;
                for (i, failure) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                write!(f, "]")
            }
        }
    }
}
