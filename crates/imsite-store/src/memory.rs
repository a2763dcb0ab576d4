//! In-memory store
//!
//! Reference implementation of the store traits. Enforces the membership
//! uniqueness constraint and batch atomicity that a relational backend would.

use crate::error::StoreError;
use crate::traits::{InstrumentStore, MembershipStore, ProjectStore};
use imsite_model::{Instrument, Membership, Project, ProjectId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Serializable contents of a store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub projects: Vec<Project>,
    pub instruments: Vec<Instrument>,
    pub memberships: Vec<Membership>,
}

impl StoreSnapshot {
    /// Parse a JSON snapshot
    ///
    /// # Errors
    /// Returns [`StoreError::Rejected`] if the JSON does not describe a snapshot.
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Rejected(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct Tables {
    projects: BTreeMap<ProjectId, Project>,
    instruments: Vec<Instrument>,
    memberships: Vec<Membership>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store from a snapshot
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] if the snapshot repeats a membership row.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        for project in snapshot.projects {
            store.put_project(project);
        }
        for instrument in snapshot.instruments {
            store.put_instrument(instrument);
        }
        store.tables.write().insert_batch(&snapshot.memberships)?;
        Ok(store)
    }

    /// Insert or replace a project record
    pub fn put_project(&self, project: Project) {
        self.tables.write().projects.insert(project.id, project);
    }

    /// Append an instrument record
    pub fn put_instrument(&self, instrument: Instrument) {
        self.tables.write().instruments.push(instrument);
    }

    /// Copy out the current contents
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        let tables = self.tables.read();
        StoreSnapshot {
            projects: tables.projects.values().cloned().collect(),
            instruments: tables.instruments.clone(),
            memberships: tables.memberships.clone(),
        }
    }

    /// Number of membership rows across all users
    #[inline]
    #[must_use]
    pub fn membership_count(&self) -> usize {
        self.tables.read().memberships.len()
    }
}

impl Tables {
    fn insert_batch(&mut self, rows: &[Membership]) -> Result<(), StoreError> {
        let mut existing: HashSet<(&str, ProjectId)> = self
            .memberships
            .iter()
            .map(|m| (m.user_email.as_str(), m.project_id))
            .collect();

        for row in rows {
            if row.user_email.trim().is_empty() {
                return Err(StoreError::Rejected(format!(
                    "membership for project {} has no user email",
                    row.project_id
                )));
            }
            if !existing.insert((row.user_email.as_str(), row.project_id)) {
                return Err(StoreError::Conflict {
                    user_email: row.user_email.clone(),
                    project_id: row.project_id,
                });
            }
        }

        self.memberships.extend(rows.iter().cloned());
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProjectStore for MemoryStore {
    async fn projects_by_ids(&self, ids: &[ProjectId]) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .projects
            .values()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl InstrumentStore for MemoryStore {
    async fn instruments_by_project(
        &self,
        project_id: ProjectId,
    ) -> Result<Vec<Instrument>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .instruments
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl MembershipStore for MemoryStore {
    async fn memberships_by_user(&self, user_email: &str) -> Result<Vec<Membership>, StoreError> {
        let tables = self.tables.read();
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.user_email == user_email)
            .cloned()
            .collect())
    }

    async fn delete_memberships_by_user(&self, user_email: &str) -> Result<usize, StoreError> {
        let mut tables = self.tables.write();
        let before = tables.memberships.len();
        tables.memberships.retain(|m| m.user_email != user_email);
        let removed = before - tables.memberships.len();
        tracing::debug!(user = user_email, removed, "deleted membership rows");
        Ok(removed)
    }

    async fn insert_memberships(&self, rows: &[Membership]) -> Result<(), StoreError> {
        self.tables.write().insert_batch(rows)?;
        tracing::debug!(rows = rows.len(), "inserted membership rows");
        Ok(())
    }
}
