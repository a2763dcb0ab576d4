//! Navigation service
//!
//! Runs a complete resolution pass against the store:
//! 1. resolve visible projects (access)
//! 2. fetch project records for them
//! 3. fetch each project's instruments, concurrently, keeping project order
//! 4. classify and build the tree
//!
//! Any failed read degrades the pass to an empty tree; the failure is returned
//! alongside so the caller can report it.

use crate::access;
use crate::classify::InstrumentClassifier;
use crate::error::{LookupFailure, LookupStage, Resolution};
use crate::session::{CommitOutcome, ResolutionSession};
use crate::tree::{build_menu, ExpandState, NavigationNode, TreeBuilder};
use futures::future::try_join_all;
use imsite_model::{Instrument, Principal, Project, ProjectId, SiteConfig};
use imsite_store::SiteStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of [`NavigationService::refresh`]
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    /// Whether the resolved tree replaced the session's tree
    pub commit: CommitOutcome,
    /// Read failure that degraded the pass, if any
    pub failure: Option<LookupFailure>,
}

/// Resolves navigation trees for principals
pub struct NavigationService {
    config: Arc<SiteConfig>,
    store: Arc<dyn SiteStore>,
    builder: TreeBuilder,
}

impl std::fmt::Debug for NavigationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NavigationService {
    /// Create service over shared configuration and store
    #[must_use]
    pub fn new(config: Arc<SiteConfig>, store: Arc<dyn SiteStore>) -> Self {
        let builder = TreeBuilder::new(InstrumentClassifier::new(config.clone()));
        Self {
            config,
            store,
            builder,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &InstrumentClassifier {
        self.builder.classifier()
    }

    /// Visible project ids for `principal`, degrading to none on failure
    pub async fn accessible_projects(&self, principal: &Principal) -> Resolution<Vec<ProjectId>> {
        access::resolve_or_degrade(principal, &self.config.project_allow_list, &*self.store).await
    }

    /// Project nodes for `principal`
    ///
    /// # Errors
    /// Returns the first [`LookupFailure`] encountered.
    pub async fn try_project_nodes(
        &self,
        principal: &Principal,
        expand: &ExpandState,
    ) -> Result<Vec<NavigationNode>, LookupFailure> {
        let visible = access::resolve_accessible_projects(
            principal,
            &self.config.project_allow_list,
            &*self.store,
        )
        .await?;

        if visible.is_empty() {
            return Ok(Vec::new());
        }

        let projects = self
            .store
            .projects_by_ids(&visible)
            .await
            .map_err(|e| LookupFailure::new(LookupStage::Projects, e))?;
        let projects_by_id: HashMap<ProjectId, Project> =
            projects.into_iter().map(|p| (p.id, p)).collect();

        let present: Vec<ProjectId> = visible
            .iter()
            .copied()
            .filter(|id| projects_by_id.contains_key(id))
            .collect();
        let instruments = try_join_all(present.iter().map(|id| self.instruments_of(*id))).await?;
        let instruments_by_project: HashMap<ProjectId, Vec<Instrument>> =
            present.into_iter().zip(instruments).collect();

        let nodes = self
            .builder
            .build(&visible, &projects_by_id, &instruments_by_project, expand);
        tracing::info!(user = %principal.email, projects = nodes.len(), "resolved navigation");
        Ok(nodes)
    }

    /// Project nodes for `principal`, degrading to none on failure
    pub async fn project_nodes(
        &self,
        principal: &Principal,
        expand: &ExpandState,
    ) -> Resolution<Vec<NavigationNode>> {
        let resolution = Resolution::from_result(self.try_project_nodes(principal, expand).await);
        if let Some(failure) = &resolution.failure {
            tracing::warn!(user = %principal.email, "navigation degraded: {}", failure);
        }
        resolution
    }

    /// Full sidebar menu for `principal`
    ///
    /// On a failed read the menu is still produced, with no project nodes.
    pub async fn menu(
        &self,
        principal: &Principal,
        expand: &ExpandState,
    ) -> Resolution<Vec<NavigationNode>> {
        self.project_nodes(principal, expand)
            .await
            .map(|nodes| build_menu(principal, nodes, expand))
    }

    /// Resolve the menu and commit it through `session`
    ///
    /// The ticket is taken before any read, so a refresh started later wins
    /// even if it finishes first.
    pub async fn refresh(
        &self,
        session: &ResolutionSession,
        principal: &Principal,
        expand: &ExpandState,
    ) -> RefreshOutcome {
        let ticket = session.begin();
        let resolution = self.menu(principal, expand).await;
        let commit = session.commit(ticket, resolution.value);
        RefreshOutcome {
            commit,
            failure: resolution.failure,
        }
    }

    async fn instruments_of(&self, project_id: ProjectId) -> Result<Vec<Instrument>, LookupFailure> {
        self.store
            .instruments_by_project(project_id)
            .await
            .map_err(|e| LookupFailure::new(LookupStage::Instruments(project_id), e))
    }
}
