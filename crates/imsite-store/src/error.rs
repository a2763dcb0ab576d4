//! Error types for store operations

use imsite_model::ProjectId;

/// Failure reported by the backing store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Transport failure or store unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Request refused by store-side validation
    #[error("rejected by store: {0}")]
    Rejected(String),

    /// Membership row already exists
    #[error("membership for {user_email} on project {project_id} already exists")]
    Conflict {
        user_email: String,
        project_id: ProjectId,
    },
}

impl StoreError {
    /// Check if retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
