//! Error types for navigation resolution and reconciliation
//!
//! - [`LookupFailure`]: a read failed; callers degrade to an empty result
//! - [`ReconciliationFailure`]: a membership write sequence failed
//! - [`ReconcileError`]: everything an administrative edit can report
//!
//! An instrument that matches no classification rule is not an error; it
//! receives the `#` route.

use imsite_model::ProjectId;
use imsite_store::StoreError;
use std::fmt;

/// Which read failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    /// Listing a user's membership rows
    Memberships,
    /// Listing project records
    Projects,
    /// Listing one project's instruments
    Instruments(ProjectId),
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupStage::Memberships => f.write_str("memberships"),
            LookupStage::Projects => f.write_str("projects"),
            LookupStage::Instruments(id) => write!(f, "instruments of project {id}"),
        }
    }
}

/// A read from the backing store failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("lookup of {stage} failed: {source}")]
pub struct LookupFailure {
    pub stage: LookupStage,
    #[source]
    pub source: StoreError,
}

impl LookupFailure {
    #[inline]
    #[must_use]
    pub fn new(stage: LookupStage, source: StoreError) -> Self {
        Self { stage, source }
    }
}

/// Value produced by a read path that degrades instead of failing
///
/// `failure` is set when the value is the degraded (empty) fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<T> {
    pub value: T,
    pub failure: Option<LookupFailure>,
}

impl<T> Resolution<T> {
    /// Fully resolved value
    #[inline]
    pub fn resolved(value: T) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    /// Degraded value with the failure that caused it
    #[inline]
    pub fn degraded(value: T, failure: LookupFailure) -> Self {
        Self {
            value,
            failure: Some(failure),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    /// Transform the value, keeping the failure
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        Resolution {
            value: f(self.value),
            failure: self.failure,
        }
    }
}

impl<T: Default> Resolution<T> {
    /// Fold a lookup result, substituting the default value on failure
    pub fn from_result(result: Result<T, LookupFailure>) -> Self {
        match result {
            Ok(value) => Self::resolved(value),
            Err(failure) => Self::degraded(T::default(), failure),
        }
    }
}

/// Write phase of a whole-replacement reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    /// Deleting the user's existing rows
    Retract,
    /// Inserting the desired rows
    Insert,
}

impl fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilePhase::Retract => f.write_str("retract"),
            ReconcilePhase::Insert => f.write_str("insert"),
        }
    }
}

/// What happened to the prior membership rows after a failed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackState {
    /// Nothing had been changed
    NotRequired,
    /// Retracted rows were re-inserted
    Restored,
    /// Re-inserting the retracted rows also failed
    Failed(StoreError),
}

impl RollbackState {
    /// Whether the prior membership state is in place
    #[inline]
    #[must_use]
    pub fn prior_state_intact(&self) -> bool {
        !matches!(self, RollbackState::Failed(_))
    }
}

/// A membership write sequence failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reconciling {user_email} to {attempted:?} failed during {phase}: {source}")]
pub struct ReconciliationFailure {
    /// User whose memberships were being replaced
    pub user_email: String,
    /// Desired project set
    pub attempted: Vec<ProjectId>,
    /// Phase that failed
    pub phase: ReconcilePhase,
    /// Store error from that phase
    #[source]
    pub source: StoreError,
    /// Outcome of restoring the prior rows
    pub rollback: RollbackState,
}

impl ReconciliationFailure {
    /// Check if the same edit can be retried as-is
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable() && self.rollback.prior_state_intact()
    }
}

/// Errors surfaced to the administrator on a membership edit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// Write sequence failed
    #[error(transparent)]
    Failed(#[from] ReconciliationFailure),

    /// Current memberships could not be read
    #[error("cannot load current memberships: {0}")]
    Lookup(#[from] LookupFailure),

    /// Another reconciliation for the same user is still running
    #[error("reconciliation already in progress for {user_email}")]
    InProgress { user_email: String },

    /// No user email to reconcile
    #[error("user email is empty")]
    MissingUser,

    /// The write task stopped before reporting; the user's rows are unknown
    #[error("membership write for {user_email} was interrupted")]
    Interrupted { user_email: String },
}

impl ReconcileError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Failed(failure) => failure.is_retryable(),
            Self::Lookup(failure) => failure.source.is_retryable(),
            Self::InProgress { .. } => true,
            Self::MissingUser | Self::Interrupted { .. } => false,
        }
    }
}
