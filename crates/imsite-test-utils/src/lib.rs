//! Testing utilities for the imSite workspace
//!
//! Shared fixtures, a fault-injecting store wrapper, and test logging.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use imsite_model::{
    Instrument, Membership, PermissionFlags, Principal, Project, ProjectId, SiteConfig,
};
use imsite_store::{
    InstrumentStore, MembershipStore, MemoryStore, ProjectStore, StoreError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const LONG_BRIDGE: ProjectId = ProjectId(24637);
pub const DGMTS_TESTING: ProjectId = ProjectId(20151);
pub const ANC_DAR_BC: ProjectId = ProjectId(24429);

pub const ADMIN_EMAIL: &str = "admin@dgmts.com";
pub const FIELD_EMAIL: &str = "field@dgmts.com";

/// Install a test subscriber honouring `RUST_LOG`; repeated calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn site_config() -> Arc<SiteConfig> {
    Arc::new(SiteConfig::default())
}

pub fn admin() -> Principal {
    Principal::admin(ADMIN_EMAIL)
}

/// Field user with graph access and memberships seeded by [`seeded_store`]
pub fn field_user() -> Principal {
    Principal::user(FIELD_EMAIL).with_permissions(PermissionFlags {
        access_to_site: true,
        view_graph: true,
        ..PermissionFlags::default()
    })
}

/// Store with the three dashboard projects, their instruments, and
/// [`FIELD_EMAIL`] granted Long Bridge North and ANC DAR-BC
///
/// DGMTS Testing has no instruments.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.put_project(Project::new(LONG_BRIDGE, "Long Bridge North"));
    store.put_project(Project::new(DGMTS_TESTING, "DGMTS Testing"));
    store.put_project(Project::new(ANC_DAR_BC, "ANC DAR-BC"));
    store.put_project(Project::new(30000, "Not Allow-listed"));

    for instrument in [
        Instrument::new("SMG1", "Seismograph 1", LONG_BRIDGE),
        Instrument::new("AMTS-7", "Track Prism 7", LONG_BRIDGE),
        Instrument::new("AMTS-8", "Reference Prism 8", LONG_BRIDGE),
        Instrument::new("TILT-142939", "Tiltmeter 142939", LONG_BRIDGE),
        Instrument::new("SMG-2", "Seismograph 2", ANC_DAR_BC),
        Instrument::new("XYZ-1", "Unknown Device", ANC_DAR_BC),
        Instrument::new("SMG-9", "Seismograph 9", 30000),
    ] {
        store.put_instrument(instrument);
    }

    let seeded = MemoryStore::from_snapshot(imsite_store::StoreSnapshot {
        memberships: vec![
            Membership::new(FIELD_EMAIL, LONG_BRIDGE),
            Membership::new(FIELD_EMAIL, ANC_DAR_BC),
            Membership::new(FIELD_EMAIL, 30000),
        ],
        ..store.snapshot()
    });
    match seeded {
        Ok(store) => store,
        Err(e) => panic!("fixture memberships conflict: {e}"),
    }
}

/// Store operation selector for [`FaultyStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ProjectsByIds,
    InstrumentsByProject,
    MembershipsByUser,
    DeleteMemberships,
    InsertMemberships,
}

#[derive(Debug, Clone)]
enum Fault {
    Always(StoreError),
    OnCall(usize, StoreError),
}

#[derive(Debug, Default)]
struct FaultState {
    faults: HashMap<StoreOp, Fault>,
    delays: HashMap<StoreOp, Duration>,
    calls: Vec<StoreOp>,
}

/// Wraps a store and injects failures or latency per operation
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: S,
    state: Mutex<FaultState>,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(FaultState::default()),
        }
    }

    /// Every call to `op` fails
    #[must_use]
    pub fn fail_always(self, op: StoreOp, error: StoreError) -> Self {
        self.state.lock().faults.insert(op, Fault::Always(error));
        self
    }

    /// Only the `n`th call (1-based) to `op` fails
    #[must_use]
    pub fn fail_on_call(self, op: StoreOp, n: usize, error: StoreError) -> Self {
        self.state.lock().faults.insert(op, Fault::OnCall(n, error));
        self
    }

    /// Every call to `op` sleeps first
    #[must_use]
    pub fn delay(self, op: StoreOp, latency: Duration) -> Self {
        self.state.lock().delays.insert(op, latency);
        self
    }

    /// Operations called so far, in order
    pub fn calls(&self) -> Vec<StoreOp> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, op: StoreOp) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        let (delay, outcome) = {
            let mut state = self.state.lock();
            state.calls.push(op);
            let nth = state.calls.iter().filter(|c| **c == op).count();
            let outcome = match state.faults.get(&op) {
                Some(Fault::Always(e)) => Err(e.clone()),
                Some(Fault::OnCall(n, e)) if *n == nth => Err(e.clone()),
                _ => Ok(()),
            };
            (state.delays.get(&op).copied(), outcome)
        };
        if let Some(latency) = delay {
            tokio::time::sleep(latency).await;
        }
        outcome
    }
}

#[async_trait::async_trait]
impl<S: ProjectStore> ProjectStore for FaultyStore<S> {
    async fn projects_by_ids(&self, ids: &[ProjectId]) -> Result<Vec<Project>, StoreError> {
        self.enter(StoreOp::ProjectsByIds).await?;
        self.inner.projects_by_ids(ids).await
    }
}

#[async_trait::async_trait]
impl<S: InstrumentStore> InstrumentStore for FaultyStore<S> {
    async fn instruments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Instrument>, StoreError> {
        self.enter(StoreOp::InstrumentsByProject).await?;
        self.inner.instruments_by_project(project_id).await
    }
}

#[async_trait::async_trait]
impl<S: MembershipStore> MembershipStore for FaultyStore<S> {
    async fn memberships_by_user(&self, user_email: &str) -> Result<Vec<Membership>, StoreError> {
        self.enter(StoreOp::MembershipsByUser).await?;
        self.inner.memberships_by_user(user_email).await
    }

    async fn delete_memberships_by_user(&self, user_email: &str) -> Result<usize, StoreError> {
        self.enter(StoreOp::DeleteMemberships).await?;
        self.inner.delete_memberships_by_user(user_email).await
    }

    async fn insert_memberships(&self, rows: &[Membership]) -> Result<(), StoreError> {
        self.enter(StoreOp::InsertMemberships).await?;
        self.inner.insert_memberships(rows).await
    }
}

/// Sorted project ids a user holds in `store`
pub async fn membership_ids<S: MembershipStore + ?Sized>(store: &S, user_email: &str) -> Vec<ProjectId> {
    let mut ids: Vec<ProjectId> = match store.memberships_by_user(user_email).await {
        Ok(rows) => rows.into_iter().map(|m| m.project_id).collect(),
        Err(e) => panic!("membership read failed: {e}"),
    };
    ids.sort();
    ids
}

pub fn unavailable() -> StoreError {
    StoreError::Unavailable("connection reset".to_string())
}
