//! Store traits
//!
//! Implement these to connect the navigation core to a backing store. All
//! operations are asynchronous and may fail with [`StoreError`].

use crate::error::StoreError;
use imsite_model::{Instrument, Membership, Project, ProjectId};
use std::sync::Arc;

/// Read access to project records
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    /// List the projects whose id is in `ids`
    ///
    /// Ids with no record are skipped. Result order is unspecified.
    async fn projects_by_ids(&self, ids: &[ProjectId]) -> Result<Vec<Project>, StoreError>;
}

/// Read access to instrument records
#[async_trait::async_trait]
pub trait InstrumentStore: Send + Sync {
    /// List the instruments of one project in store order
    async fn instruments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Instrument>, StoreError>;
}

/// Read and write access to membership rows
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    /// List every membership row for `user_email`
    async fn memberships_by_user(&self, user_email: &str) -> Result<Vec<Membership>, StoreError>;

    /// Delete every membership row for `user_email`, returning the count removed
    async fn delete_memberships_by_user(&self, user_email: &str) -> Result<usize, StoreError>;

    /// Insert rows as one batch; either all rows land or none do
    async fn insert_memberships(&self, rows: &[Membership]) -> Result<(), StoreError>;
}

/// Everything the navigation core needs from the backing store
pub trait SiteStore: ProjectStore + InstrumentStore + MembershipStore {}

impl<T> SiteStore for T where T: ProjectStore + InstrumentStore + MembershipStore + ?Sized {}

#[async_trait::async_trait]
impl<S: ProjectStore + ?Sized> ProjectStore for Arc<S> {
    async fn projects_by_ids(&self, ids: &[ProjectId]) -> Result<Vec<Project>, StoreError> {
        (**self).projects_by_ids(ids).await
    }
}

#[async_trait::async_trait]
impl<S: InstrumentStore + ?Sized> InstrumentStore for Arc<S> {
    async fn instruments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Instrument>, StoreError> {
        (**self).instruments_by_project(project_id).await
    }
}

#[async_trait::async_trait]
impl<S: MembershipStore + ?Sized> MembershipStore for Arc<S> {
    async fn memberships_by_user(&self, user_email: &str) -> Result<Vec<Membership>, StoreError> {
        (**self).memberships_by_user(user_email).await
    }

    async fn delete_memberships_by_user(&self, user_email: &str) -> Result<usize, StoreError> {
        (**self).delete_memberships_by_user(user_email).await
    }

    async fn insert_memberships(&self, rows: &[Membership]) -> Result<(), StoreError> {
        (**self).insert_memberships(rows).await
    }
}
