//! Membership reconciliation
//!
//! Replaces a user's project memberships with a desired set when an
//! administrator saves an edit.
//!
//! Planning is pure: if the current and desired sets are equal (order
//! ignored) nothing is written, so saving unrelated user fields causes no
//! membership churn. Otherwise the plan is a whole replacement: retract every
//! row for the user, then insert one row per desired project.
//!
//! Whole replacement is not a minimal diff. Two administrators editing the
//! same user from different processes can still lose an update; within one
//! process the [`Reconciler`] rejects overlapping edits for the same user.

use crate::error::{
    LookupFailure, LookupStage, ReconcileError, ReconcilePhase, ReconciliationFailure,
    RollbackState,
};
use dashmap::DashMap;
use imsite_model::{Membership, ProjectId};
use imsite_store::MembershipStore;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// Whole-replacement write set for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// User whose rows are replaced
    pub user_email: String,
    /// Projects whose rows are deleted (the whole current set)
    pub retract: Vec<ProjectId>,
    /// Projects whose rows are inserted afterwards (the whole desired set)
    pub insert: Vec<ProjectId>,
}

impl Replacement {
    /// Rows inserted by the second phase
    #[must_use]
    pub fn insert_rows(&self) -> Vec<Membership> {
        rows_for(&self.user_email, &self.insert)
    }

    /// Rows that existed before the first phase
    #[must_use]
    pub fn prior_rows(&self) -> Vec<Membership> {
        rows_for(&self.user_email, &self.retract)
    }
}

/// Writes needed to reach a desired membership set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipPlan {
    /// Current and desired sets are equal
    Unchanged,
    /// Retract everything, then insert the desired set
    Replace(Replacement),
}

impl MembershipPlan {
    /// Whether applying the plan writes nothing
    #[inline]
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        matches!(self, MembershipPlan::Unchanged)
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing written
    Unchanged,
    /// Rows replaced
    Replaced { retracted: usize, inserted: usize },
}

/// Plan the writes that take `user_email` from `current` to `desired`
///
/// Rows in `current` for other users are ignored. Repeated ids in `desired`
/// are collapsed, keeping first-occurrence order.
#[must_use]
pub fn plan_reconciliation(
    user_email: &str,
    current: &[Membership],
    desired: &[ProjectId],
) -> MembershipPlan {
    let retract = dedup(
        current
            .iter()
            .filter(|m| m.user_email == user_email)
            .map(|m| m.project_id),
    );
    let insert = dedup(desired.iter().copied());

    let current_set: BTreeSet<ProjectId> = retract.iter().copied().collect();
    let desired_set: BTreeSet<ProjectId> = insert.iter().copied().collect();
    if current_set == desired_set {
        return MembershipPlan::Unchanged;
    }

    MembershipPlan::Replace(Replacement {
        user_email: user_email.to_string(),
        retract,
        insert,
    })
}

/// Applies membership plans, one at a time per user
pub struct Reconciler {
    store: Arc<dyn MembershipStore>,
    in_flight: Arc<DashMap<String, ()>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("in_flight", &self.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create reconciler writing through `store`
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Whether a reconciliation for `user_email` is running
    #[inline]
    #[must_use]
    pub fn is_in_flight(&self, user_email: &str) -> bool {
        self.in_flight.contains_key(user_email)
    }

    /// Load the user's current rows, plan, and apply
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Cancel safety
    /// Dropping the returned future before the current rows are read writes
    /// nothing. Once writing starts, the retract, insert and any rollback run
    /// to completion on a background task, and the user stays in flight
    /// until that task finishes.
    ///
    /// # Errors
    /// - [`ReconcileError::MissingUser`] if `user_email` is blank
    /// - [`ReconcileError::InProgress`] if the user is already being reconciled
    /// - [`ReconcileError::Lookup`] if current rows cannot be read
    /// - [`ReconcileError::Failed`] if a write phase fails
    /// - [`ReconcileError::Interrupted`] if the write task stops without reporting
    pub async fn reconcile_user(
        &self,
        user_email: &str,
        desired: &[ProjectId],
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let guard = self.acquire(user_email)?;

        let current = self
            .store
            .memberships_by_user(user_email)
            .await
            .map_err(|e| LookupFailure::new(LookupStage::Memberships, e))?;

        let plan = plan_reconciliation(user_email, &current, desired);
        self.write(guard, plan).await
    }

    /// Apply a plan computed by the caller
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Cancel safety
    /// As [`Reconciler::reconcile_user`]: a started write always completes or
    /// rolls back, even if this future is dropped.
    ///
    /// # Errors
    /// As [`Reconciler::reconcile_user`], minus the lookup.
    pub async fn apply(&self, plan: MembershipPlan) -> Result<ReconcileOutcome, ReconcileError> {
        let user_email = match &plan {
            MembershipPlan::Unchanged => return Ok(ReconcileOutcome::Unchanged),
            MembershipPlan::Replace(replacement) => replacement.user_email.clone(),
        };
        let guard = self.acquire(&user_email)?;
        self.write(guard, plan).await
    }

    async fn write(
        &self,
        guard: InFlightGuard,
        plan: MembershipPlan,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let replacement = match plan {
            MembershipPlan::Unchanged => return Ok(ReconcileOutcome::Unchanged),
            MembershipPlan::Replace(replacement) => replacement,
        };
        let user_email = replacement.user_email.clone();
        let store = self.store.clone();

        // Owns the guard: the user is released only when the writes settle
        let task = tokio::spawn(async move {
            let result = replace(&*store, &replacement).await;
            drop(guard);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => {
                tracing::error!(user = %user_email, "membership write task cancelled");
                Err(ReconcileError::Interrupted { user_email })
            }
        }
    }

    fn acquire(&self, user_email: &str) -> Result<InFlightGuard, ReconcileError> {
        if user_email.trim().is_empty() {
            return Err(ReconcileError::MissingUser);
        }
        if self.in_flight.insert(user_email.to_string(), ()).is_some() {
            tracing::warn!(user = user_email, "reconciliation already in progress");
            return Err(ReconcileError::InProgress {
                user_email: user_email.to_string(),
            });
        }
        Ok(InFlightGuard {
            map: self.in_flight.clone(),
            user_email: user_email.to_string(),
        })
    }
}

/// Retract every row for the user, then insert the desired rows
async fn replace(
    store: &dyn MembershipStore,
    replacement: &Replacement,
) -> Result<ReconcileOutcome, ReconcileError> {
    let user = replacement.user_email.as_str();

    let retracted = match store.delete_memberships_by_user(user).await {
        Ok(count) => count,
        Err(source) => {
            let failure = failure_for(
                replacement,
                ReconcilePhase::Retract,
                source,
                RollbackState::NotRequired,
            );
            tracing::error!("{}", failure);
            return Err(failure.into());
        }
    };

    let rows = replacement.insert_rows();
    if !rows.is_empty() {
        if let Err(source) = store.insert_memberships(&rows).await {
            let rollback = restore(store, replacement).await;
            let failure = failure_for(replacement, ReconcilePhase::Insert, source, rollback);
            tracing::error!(rollback = ?failure.rollback, "{}", failure);
            return Err(failure.into());
        }
    }

    tracing::info!(
        user,
        retracted,
        inserted = rows.len(),
        "replaced project memberships"
    );
    Ok(ReconcileOutcome::Replaced {
        retracted,
        inserted: rows.len(),
    })
}

async fn restore(store: &dyn MembershipStore, replacement: &Replacement) -> RollbackState {
    let prior = replacement.prior_rows();
    if prior.is_empty() {
        return RollbackState::Restored;
    }
    match store.insert_memberships(&prior).await {
        Ok(()) => {
            tracing::warn!(user = %replacement.user_email, rows = prior.len(), "restored prior memberships");
            RollbackState::Restored
        }
        Err(e) => {
            tracing::error!(user = %replacement.user_email, "restoring prior memberships failed: {}", e);
            RollbackState::Failed(e)
        }
    }
}

/// Clears the in-flight marker for a user on drop
struct InFlightGuard {
    map: Arc<DashMap<String, ()>>,
    user_email: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.user_email);
    }
}

fn failure_for(
    replacement: &Replacement,
    phase: ReconcilePhase,
    source: imsite_store::StoreError,
    rollback: RollbackState,
) -> ReconciliationFailure {
    ReconciliationFailure {
        user_email: replacement.user_email.clone(),
        attempted: replacement.insert.clone(),
        phase,
        source,
        rollback,
    }
}

fn rows_for(user_email: &str, ids: &[ProjectId]) -> Vec<Membership> {
    ids.iter()
        .map(|id| Membership::new(user_email, *id))
        .collect()
}

fn dedup(ids: impl Iterator<Item = ProjectId>) -> Vec<ProjectId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use imsite_store::MemoryStore;
    use proptest::prelude::*;

    fn ids(raw: &[i64]) -> Vec<ProjectId> {
        raw.iter().copied().map(ProjectId).collect()
    }

    fn rows(user: &str, raw: &[i64]) -> Vec<Membership> {
        rows_for(user, &ids(raw))
    }

    #[test]
    fn equal_sets_produce_no_writes() {
        let plan = plan_reconciliation("a@b.c", &rows("a@b.c", &[3, 1, 2]), &ids(&[1, 2, 3]));
        assert!(plan.is_unchanged());
    }

    #[test]
    fn changed_set_is_whole_replacement() {
        let plan = plan_reconciliation("a@b.c", &rows("a@b.c", &[1, 2, 3]), &ids(&[2, 3, 4]));
        assert_eq!(
            plan,
            MembershipPlan::Replace(Replacement {
                user_email: "a@b.c".to_string(),
                retract: ids(&[1, 2, 3]),
                insert: ids(&[2, 3, 4]),
            })
        );
    }

    #[test]
    fn clearing_all_projects_retracts_everything() {
        let plan = plan_reconciliation("a@b.c", &rows("a@b.c", &[1]), &[]);
        let MembershipPlan::Replace(replacement) = plan else {
            panic!("expected replacement");
        };
        assert_eq!(replacement.retract, ids(&[1]));
        assert!(replacement.insert.is_empty());
    }

    #[test]
    fn duplicate_desired_ids_collapse() {
        let plan = plan_reconciliation("a@b.c", &[], &ids(&[5, 4, 5]));
        let MembershipPlan::Replace(replacement) = plan else {
            panic!("expected replacement");
        };
        assert_eq!(replacement.insert, ids(&[5, 4]));
    }

    #[test]
    fn other_users_rows_are_ignored() {
        let current = rows("x@y.z", &[1, 2]);
        assert!(plan_reconciliation("a@b.c", &current, &[]).is_unchanged());
    }

    #[tokio::test]
    async fn reconcile_user_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        store.insert_memberships(&rows("a@b.c", &[1, 2, 3])).await.unwrap();
        let reconciler = Reconciler::new(store.clone());

        let first = reconciler.reconcile_user("a@b.c", &ids(&[2, 3, 4])).await.unwrap();
        assert_eq!(first, ReconcileOutcome::Replaced { retracted: 3, inserted: 3 });

        let second = reconciler.reconcile_user("a@b.c", &ids(&[4, 3, 2])).await.unwrap();
        assert_eq!(second, ReconcileOutcome::Unchanged);

        let mut now: Vec<ProjectId> = store
            .memberships_by_user("a@b.c")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.project_id)
            .collect();
        now.sort();
        assert_eq!(now, ids(&[2, 3, 4]));
    }

    #[tokio::test]
    async fn blank_user_rejected() {
        let reconciler = Reconciler::new(Arc::new(MemoryStore::new()));
        let err = reconciler.reconcile_user(" ", &ids(&[1])).await.unwrap_err();
        assert_eq!(err, ReconcileError::MissingUser);
    }

    #[tokio::test]
    async fn guard_released_after_completion() {
        let reconciler = Reconciler::new(Arc::new(MemoryStore::new()));
        reconciler.reconcile_user("a@b.c", &ids(&[1])).await.unwrap();
        assert!(!reconciler.is_in_flight("a@b.c"));
    }

    #[tokio::test]
    async fn overlapping_apply_for_same_user_rejected() {
        let reconciler = Reconciler::new(Arc::new(MemoryStore::new()));
        let _held = reconciler.acquire("a@b.c").unwrap();

        let plan = plan_reconciliation("a@b.c", &[], &ids(&[1]));
        let err = reconciler.apply(plan).await.unwrap_err();
        assert!(matches!(err, ReconcileError::InProgress { .. }));

        // Other users are unaffected
        assert!(reconciler.reconcile_user("x@y.z", &ids(&[1])).await.is_ok());
    }

    proptest! {
        #[test]
        fn prop_replan_after_apply_is_unchanged(
            current in proptest::collection::hash_set(1i64..40, 0..8),
            desired in proptest::collection::vec(1i64..40, 0..8),
        ) {
            let current: Vec<i64> = current.into_iter().collect();
            let plan = plan_reconciliation("a@b.c", &rows("a@b.c", &current), &ids(&desired));
            let after = match plan {
                MembershipPlan::Unchanged => rows("a@b.c", &current),
                MembershipPlan::Replace(replacement) => replacement.insert_rows(),
            };
            prop_assert!(plan_reconciliation("a@b.c", &after, &ids(&desired)).is_unchanged());
        }
    }
}
