//! Resolution session
//!
//! Tracks the latest resolution pass for one UI session. Starting a pass
//! supersedes every pass before it, so a slow response for an old principal or
//! allow-list can never overwrite a newer tree (last request wins).

use crate::tree::NavigationNode;
use parking_lot::Mutex;
use std::sync::Arc;

/// Handle for one in-flight resolution pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolutionTicket(u64);

impl ResolutionTicket {
    #[inline]
    #[must_use]
    pub fn generation(self) -> u64 {
        self.0
    }
}

/// Result of committing a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The tree became the session's current tree
    Applied,
    /// A newer pass was started; the tree was dropped
    Discarded,
}

#[derive(Debug, Default)]
struct SessionState {
    generation: u64,
    committed: Option<u64>,
    nodes: Arc<Vec<NavigationNode>>,
}

/// Last-request-wins holder of the current navigation tree
#[derive(Debug, Default)]
pub struct ResolutionSession {
    state: Mutex<SessionState>,
}

impl ResolutionSession {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pass, superseding any pass in flight
    pub fn begin(&self) -> ResolutionTicket {
        let mut state = self.state.lock();
        state.generation += 1;
        ResolutionTicket(state.generation)
    }

    /// Supersede any pass in flight without starting a new one
    ///
    /// Call when the principal or allow-list changes, or on sign-out.
    pub fn invalidate(&self) {
        self.state.lock().generation += 1;
    }

    /// Sign-out: supersede in-flight passes and drop the current tree
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.committed = None;
        state.nodes = Arc::new(Vec::new());
    }

    /// Store `nodes` if `ticket` is still the latest pass
    pub fn commit(&self, ticket: ResolutionTicket, nodes: Vec<NavigationNode>) -> CommitOutcome {
        let mut state = self.state.lock();
        if ticket.0 != state.generation {
            tracing::debug!(
                ticket = ticket.0,
                current = state.generation,
                "discarding superseded resolution"
            );
            return CommitOutcome::Discarded;
        }
        state.committed = Some(ticket.0);
        state.nodes = Arc::new(nodes);
        CommitOutcome::Applied
    }

    /// Whether `ticket` is still the latest pass
    #[inline]
    #[must_use]
    pub fn is_current(&self, ticket: ResolutionTicket) -> bool {
        self.state.lock().generation == ticket.0
    }

    /// Most recently applied tree (empty before the first commit)
    #[must_use]
    pub fn current(&self) -> Arc<Vec<NavigationNode>> {
        self.state.lock().nodes.clone()
    }

    /// Ticket of the most recently applied tree
    #[must_use]
    pub fn committed(&self) -> Option<ResolutionTicket> {
        self.state.lock().committed.map(ResolutionTicket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(label: &str) -> Vec<NavigationNode> {
        vec![NavigationNode::link(label, "/maps")]
    }

    #[test]
    fn latest_ticket_applies() {
        let session = ResolutionSession::new();
        let ticket = session.begin();
        assert_eq!(session.commit(ticket, tree("a")), CommitOutcome::Applied);
        assert_eq!(session.current()[0].label, "a");
        assert_eq!(session.committed(), Some(ticket));
    }

    #[test]
    fn superseded_ticket_is_discarded() {
        let session = ResolutionSession::new();
        let old = session.begin();
        let new = session.begin();

        assert_eq!(session.commit(new, tree("new")), CommitOutcome::Applied);
        // Older response arriving late must not overwrite
        assert_eq!(session.commit(old, tree("old")), CommitOutcome::Discarded);
        assert_eq!(session.current()[0].label, "new");
    }

    #[test]
    fn late_first_response_is_discarded_even_before_newer_commit() {
        let session = ResolutionSession::new();
        let old = session.begin();
        let new = session.begin();

        assert_eq!(session.commit(old, tree("old")), CommitOutcome::Discarded);
        assert!(session.current().is_empty());
        assert!(session.is_current(new));
    }

    #[test]
    fn invalidate_supersedes_in_flight_pass() {
        let session = ResolutionSession::new();
        let ticket = session.begin();
        session.invalidate();
        assert!(!session.is_current(ticket));
        assert_eq!(session.commit(ticket, tree("x")), CommitOutcome::Discarded);
    }

    #[test]
    fn clear_drops_tree() {
        let session = ResolutionSession::new();
        let ticket = session.begin();
        session.commit(ticket, tree("a"));
        session.clear();
        assert!(session.current().is_empty());
        assert_eq!(session.committed(), None);
    }
}
