//! imSite Navigation
//!
//! Decides what a user may see in the dashboard sidebar and keeps project
//! memberships in step with administrative edits:
//! - Access resolution: which allow-listed projects a principal sees
//! - Instrument classification: route and icon for each instrument
//! - Tree building: projects and instruments as a collapsible sidebar
//! - Membership reconciliation: whole-replacement of a user's project grants
//!
//! # Example
//!
//! ```rust,ignore
//! use imsite_nav::{ExpandState, NavigationService, ResolutionSession};
//! use imsite_model::{Principal, SiteConfig};
//! use imsite_store::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let service = NavigationService::new(Arc::new(SiteConfig::default()), Arc::new(MemoryStore::new()));
//! let session = ResolutionSession::new();
//!
//! let outcome = service
//!     .refresh(&session, &Principal::user("field@dgmts.com"), &ExpandState::new())
//!     .await;
//! println!("{} sidebar entries", session.current().len());
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod access;
pub mod classify;
pub mod error;
pub mod reconcile;
pub mod service;
pub mod session;
pub mod tree;

pub use access::{filter_by_memberships, resolve_accessible_projects, resolve_or_degrade};
pub use classify::InstrumentClassifier;
pub use error::{
    LookupFailure, LookupStage, ReconcileError, ReconcilePhase, ReconciliationFailure,
    Resolution, RollbackState,
};
pub use reconcile::{plan_reconciliation, MembershipPlan, ReconcileOutcome, Reconciler, Replacement};
pub use service::{NavigationService, RefreshOutcome};
pub use session::{CommitOutcome, ResolutionSession, ResolutionTicket};
pub use tree::{build_menu, ExpandState, NavigationNode, NodeEntry, NodeKey, TreeBuilder};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with imSite navigation
    pub use crate::{
        ExpandState, InstrumentClassifier, NavigationNode, NavigationService, Reconciler,
        ResolutionSession,
    };
    pub use imsite_model::{Principal, ProjectId, SiteConfig};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
