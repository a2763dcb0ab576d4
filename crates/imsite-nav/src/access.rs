//! Access resolution
//!
//! Decides which allow-listed projects a principal may see.
//!
//! - administrators see the whole allow-list, in order
//! - everyone else sees the allow-listed projects they hold a membership for,
//!   in allow-list order
//! - a principal without an email sees nothing, administrator or not

use crate::error::{LookupFailure, LookupStage, Resolution};
use imsite_model::{Membership, Principal, ProjectId};
use imsite_store::MembershipStore;
use std::collections::HashSet;

/// Resolve the projects visible to `principal`
///
/// Reads the membership store only for identified non-administrators.
///
/// # Errors
/// Returns [`LookupFailure`] with stage [`LookupStage::Memberships`] if the
/// membership read fails.
pub async fn resolve_accessible_projects<S>(
    principal: &Principal,
    allow_list: &[ProjectId],
    store: &S,
) -> Result<Vec<ProjectId>, LookupFailure>
where
    S: MembershipStore + ?Sized,
{
    if !principal.is_identified() {
        tracing::debug!("no principal email, no projects resolved");
        return Ok(Vec::new());
    }

    if principal.is_admin {
        return Ok(allow_list.to_vec());
    }

    let memberships = store
        .memberships_by_user(&principal.email)
        .await
        .map_err(|e| LookupFailure::new(LookupStage::Memberships, e))?;

    Ok(filter_by_memberships(&principal.email, allow_list, &memberships))
}

/// As [`resolve_accessible_projects`], degrading a failed read to no projects
pub async fn resolve_or_degrade<S>(
    principal: &Principal,
    allow_list: &[ProjectId],
    store: &S,
) -> Resolution<Vec<ProjectId>>
where
    S: MembershipStore + ?Sized,
{
    let resolution =
        Resolution::from_result(resolve_accessible_projects(principal, allow_list, store).await);
    if let Some(failure) = &resolution.failure {
        tracing::warn!(user = %principal.email, "access resolution degraded: {}", failure);
    }
    resolution
}

/// Allow-listed projects that `user_email` holds a membership row for
///
/// Preserves allow-list order. Rows for other users are ignored.
#[must_use]
pub fn filter_by_memberships(
    user_email: &str,
    allow_list: &[ProjectId],
    memberships: &[Membership],
) -> Vec<ProjectId> {
    let granted: HashSet<ProjectId> = memberships
        .iter()
        .filter(|m| m.user_email == user_email)
        .map(|m| m.project_id)
        .collect();

    allow_list
        .iter()
        .copied()
        .filter(|id| granted.contains(id))
        .collect()
}
