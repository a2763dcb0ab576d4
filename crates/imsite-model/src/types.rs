//! Core domain types
//!
//! Defines the records the navigation core reasons about:
//! - Principals and their permission flags
//! - Projects and project identifiers
//! - Instruments (owned by exactly one project)
//! - Membership rows (user email to project)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Project identifier as assigned by the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl ProjectId {
    /// Raw integer value
    #[inline]
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for ProjectId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user feature flags maintained on the admin permissions page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionFlags {
    /// May open the projects list
    pub access_to_site: bool,
    /// May open graph pages
    pub view_graph: bool,
    /// May export graphs
    pub download_graph: bool,
    /// May open data summaries and the file manager
    pub view_data: bool,
    /// May export raw data
    pub download_data: bool,
}

impl PermissionFlags {
    /// Every flag set
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self {
            access_to_site: true,
            view_graph: true,
            download_graph: true,
            view_data: true,
            download_data: true,
        }
    }
}

/// The acting user
///
/// Administrators bypass per-project membership checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Email-like identifier; empty means unauthenticated
    pub email: String,
    /// Administrator flag
    #[serde(default)]
    pub is_admin: bool,
    /// Feature flags
    #[serde(default)]
    pub permissions: PermissionFlags,
}

impl Principal {
    /// Non-administrator principal with no feature flags
    #[inline]
    #[must_use]
    pub fn user(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_admin: false,
            permissions: PermissionFlags::default(),
        }
    }

    /// Administrator principal with every feature flag
    #[inline]
    #[must_use]
    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_admin: true,
            permissions: PermissionFlags::all(),
        }
    }

    /// Principal with no identity
    #[inline]
    #[must_use]
    pub fn anonymous() -> Self {
        Self::user("")
    }

    /// With permission flags
    #[inline]
    #[must_use]
    pub fn with_permissions(mut self, permissions: PermissionFlags) -> Self {
        self.permissions = permissions;
        self
    }

    /// Whether the principal carries a usable identity
    #[inline]
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.email.trim().is_empty()
    }
}

/// Project record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
}

impl Project {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Instrument record
///
/// The identifier carries a type-indicating prefix (`SMG`, `TILT`, `AMTS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    #[serde(rename = "instrument_id")]
    pub id: String,
    #[serde(rename = "instrument_name")]
    pub name: String,
    pub project_id: ProjectId,
}

impl Instrument {
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        project_id: impl Into<ProjectId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            project_id: project_id.into(),
        }
    }
}

/// Visibility grant of one project to one user
///
/// Unique per `(user_email, project_id)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub user_email: String,
    pub project_id: ProjectId,
}

impl Membership {
    #[inline]
    #[must_use]
    pub fn new(user_email: impl Into<String>, project_id: impl Into<ProjectId>) -> Self {
        Self {
            user_email: user_email.into(),
            project_id: project_id.into(),
        }
    }
}
