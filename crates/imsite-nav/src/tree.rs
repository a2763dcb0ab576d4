//! Navigation tree
//!
//! Composes resolved projects and classified instruments into the ordered,
//! collapsible structure the sidebar renders.
//!
//! Expand/collapse state belongs to the presentation layer. The builder reads
//! it from an [`ExpandState`] so a rebuild never resets a node the user opened.

use crate::classify::InstrumentClassifier;
use imsite_model::{Instrument, Principal, Project, ProjectId, Route, RouteClassification};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable key of a collapsible node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Project(ProjectId),
    Menu(String),
}

impl NodeKey {
    #[inline]
    #[must_use]
    pub fn menu(name: impl Into<String>) -> Self {
        Self::Menu(name.into())
    }
}

/// Open/closed flags keyed by node, owned by the presentation layer
///
/// Absent keys are collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandState {
    open: HashMap<NodeKey, bool>,
}

impl ExpandState {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_open(&self, key: &NodeKey) -> bool {
        self.open.get(key).copied().unwrap_or(false)
    }

    /// Flip a node, returning the new state
    pub fn toggle(&mut self, key: NodeKey) -> bool {
        let entry = self.open.entry(key).or_insert(false);
        *entry = !*entry;
        *entry
    }

    pub fn set(&mut self, key: NodeKey, open: bool) {
        self.open.insert(key, open);
    }

    /// Forget keys for which `keep` returns false
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&NodeKey) -> bool) {
        self.open.retain(|key, _| keep(key));
    }

    /// Forget state for projects that are no longer visible
    pub fn retain_projects(&mut self, visible: &[ProjectId]) {
        self.retain_keys(|key| match key {
            NodeKey::Project(id) => visible.contains(id),
            NodeKey::Menu(_) => true,
        });
    }
}

/// What a node stands for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeEntry {
    /// Collapsible project whose children are instruments
    Project { id: ProjectId, open: bool },
    /// Leaf instrument entry
    Instrument {
        instrument_id: String,
        classification: RouteClassification,
    },
    /// Top-level link
    Link { route: Route },
    /// Collapsible top-level menu group
    Group { key: String, open: bool },
}

/// One node of the sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationNode {
    pub label: String,
    pub entry: NodeEntry,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationNode>,
}

impl NavigationNode {
    /// Link leaf
    #[must_use]
    pub fn link(label: impl Into<String>, route: impl Into<Route>) -> Self {
        Self {
            label: label.into(),
            entry: NodeEntry::Link {
                route: route.into(),
            },
            children: Vec::new(),
        }
    }

    /// Collapsible group
    #[must_use]
    pub fn group(
        label: impl Into<String>,
        key: impl Into<String>,
        expand: &ExpandState,
        children: Vec<NavigationNode>,
    ) -> Self {
        let key = key.into();
        let open = expand.is_open(&NodeKey::Menu(key.clone()));
        Self {
            label: label.into(),
            entry: NodeEntry::Group { key, open },
            children,
        }
    }

    /// Key for collapsible nodes
    #[must_use]
    pub fn key(&self) -> Option<NodeKey> {
        match &self.entry {
            NodeEntry::Project { id, .. } => Some(NodeKey::Project(*id)),
            NodeEntry::Group { key, .. } => Some(NodeKey::Menu(key.clone())),
            NodeEntry::Instrument { .. } | NodeEntry::Link { .. } => None,
        }
    }

    /// Whether a collapsible node is open; leaves are never open
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(
            self.entry,
            NodeEntry::Project { open: true, .. } | NodeEntry::Group { open: true, .. }
        )
    }

    /// Route for leaves
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        match &self.entry {
            NodeEntry::Instrument { classification, .. } => Some(&classification.route),
            NodeEntry::Link { route } => Some(route),
            NodeEntry::Project { .. } | NodeEntry::Group { .. } => None,
        }
    }

    /// Whether the presentation layer should make this node clickable
    #[inline]
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        self.route().is_some_and(Route::is_navigable)
    }

    /// Depth-first search by project id
    #[must_use]
    pub fn find_project(&self, project_id: ProjectId) -> Option<&NavigationNode> {
        if matches!(self.entry, NodeEntry::Project { id, .. } if id == project_id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_project(project_id))
    }
}

/// Builds project nodes from resolved data
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    classifier: InstrumentClassifier,
}

impl TreeBuilder {
    #[inline]
    #[must_use]
    pub fn new(classifier: InstrumentClassifier) -> Self {
        Self { classifier }
    }

    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &InstrumentClassifier {
        &self.classifier
    }

    /// One node per visible project, in `visible` order
    ///
    /// Projects with no record in `projects_by_id` are skipped. Projects with
    /// no instruments still get a node with an empty child list. Instruments
    /// keep the order they were supplied in.
    #[must_use]
    pub fn build(
        &self,
        visible: &[ProjectId],
        projects_by_id: &HashMap<ProjectId, Project>,
        instruments_by_project: &HashMap<ProjectId, Vec<Instrument>>,
        expand: &ExpandState,
    ) -> Vec<NavigationNode> {
        visible
            .iter()
            .filter_map(|id| {
                let Some(project) = projects_by_id.get(id) else {
                    tracing::warn!(project = %id, "visible project has no record, skipping");
                    return None;
                };
                let instruments = instruments_by_project
                    .get(id)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                Some(self.project_node(project, instruments, expand))
            })
            .collect()
    }

    /// Node for one project
    #[must_use]
    pub fn project_node(
        &self,
        project: &Project,
        instruments: &[Instrument],
        expand: &ExpandState,
    ) -> NavigationNode {
        let children = instruments
            .iter()
            .filter(|i| i.project_id == project.id)
            .map(|i| NavigationNode {
                label: i.name.clone(),
                entry: NodeEntry::Instrument {
                    instrument_id: i.id.clone(),
                    classification: self.classifier.classify(&i.id, &i.name),
                },
                children: Vec::new(),
            })
            .collect::<Vec<_>>();

        tracing::debug!(project = %project.id, instruments = children.len(), "built project node");

        NavigationNode {
            label: project.name.clone(),
            entry: NodeEntry::Project {
                id: project.id,
                open: expand.is_open(&NodeKey::Project(project.id)),
            },
            children,
        }
    }
}

/// Key of the graphs menu group
pub const GRAPHS_GROUP: &str = "graphs";

/// Full sidebar menu for `principal`
///
/// Items are gated by the principal's flags; `project_nodes` are listed under
/// the graphs group after its fixed links.
#[must_use]
pub fn build_menu(
    principal: &Principal,
    project_nodes: Vec<NavigationNode>,
    expand: &ExpandState,
) -> Vec<NavigationNode> {
    let flags = principal.permissions;
    let mut menu = Vec::with_capacity(8);

    if flags.access_to_site {
        menu.push(NavigationNode::link("Projects", "/projects-list"));
    }
    menu.push(NavigationNode::link("Alarms", "/alarms"));

    if flags.view_graph {
        let mut graphs = vec![
            NavigationNode::link("Project Graphs", "/project-graphs"),
            NavigationNode::link("Custom Graphs", "/view-custom-graphs"),
        ];
        graphs.extend(project_nodes);
        menu.push(NavigationNode::group("Graphs", GRAPHS_GROUP, expand, graphs));
    }

    if flags.view_data {
        menu.push(NavigationNode::link("Data Summary", "/data-summary"));
    }
    menu.push(NavigationNode::link("Maps", "/maps"));
    if flags.view_data {
        menu.push(NavigationNode::link("File Manager", "/file-manager"));
    }

    if principal.is_admin {
        menu.push(NavigationNode::link("Admin Setup", "/admin-setup"));
    }

    menu
}

#[cfg(test)]
mod tests {
    use super::*;
    use imsite_model::{IconCategory, PermissionFlags};
    use pretty_assertions::assert_eq;

    fn fixtures() -> (HashMap<ProjectId, Project>, HashMap<ProjectId, Vec<Instrument>>) {
        let projects = [
            Project::new(24637, "Long Bridge North"),
            Project::new(20151, "DGMTS Testing"),
            Project::new(24429, "ANC DAR-BC"),
        ]
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let mut instruments = HashMap::new();
        instruments.insert(
            ProjectId(24637),
            vec![
                Instrument::new("AMTS-7", "Track Sensor A", 24637),
                Instrument::new("TILT-142939", "Tiltmeter", 24637),
            ],
        );
        instruments.insert(ProjectId(24429), vec![Instrument::new("XYZ-1", "Unknown Device", 24429)]);
        (projects, instruments)
    }

    fn labels(nodes: &[NavigationNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn nodes_follow_visible_order() {
        let (projects, instruments) = fixtures();
        let visible = [ProjectId(24429), ProjectId(24637)];
        let nodes = TreeBuilder::default().build(&visible, &projects, &instruments, &ExpandState::new());
        assert_eq!(labels(&nodes), vec!["ANC DAR-BC", "Long Bridge North"]);
    }

    #[test]
    fn project_without_instruments_has_empty_children() {
        let (projects, instruments) = fixtures();
        let nodes = TreeBuilder::default().build(
            &[ProjectId(20151)],
            &projects,
            &instruments,
            &ExpandState::new(),
        );
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].children.is_empty());
        assert_eq!(nodes[0].key(), Some(NodeKey::Project(ProjectId(20151))));
    }

    #[test]
    fn instruments_are_classified_in_store_order() {
        let (projects, instruments) = fixtures();
        let nodes = TreeBuilder::default().build(
            &[ProjectId(24637)],
            &projects,
            &instruments,
            &ExpandState::new(),
        );
        let children = &nodes[0].children;
        assert_eq!(labels(children), vec!["Track Sensor A", "Tiltmeter"]);
        assert_eq!(children[0].route().unwrap(), "/amts-track-graphs");
        assert_eq!(children[1].route().unwrap(), "/tiltmeter-142939");
        assert!(children.iter().all(NavigationNode::is_navigable));
    }

    #[test]
    fn unclassified_instrument_is_listed_but_disabled() {
        let (projects, instruments) = fixtures();
        let nodes = TreeBuilder::default().build(
            &[ProjectId(24429)],
            &projects,
            &instruments,
            &ExpandState::new(),
        );
        let leaf = &nodes[0].children[0];
        assert!(!leaf.is_navigable());
        assert!(matches!(
            &leaf.entry,
            NodeEntry::Instrument { classification, .. } if classification.icon == IconCategory::Default
        ));
    }

    #[test]
    fn missing_project_record_is_skipped() {
        let (projects, instruments) = fixtures();
        let nodes = TreeBuilder::default().build(
            &[ProjectId(1), ProjectId(20151)],
            &projects,
            &instruments,
            &ExpandState::new(),
        );
        assert_eq!(labels(&nodes), vec!["DGMTS Testing"]);
    }

    #[test]
    fn empty_inputs_build_empty_tree() {
        let nodes = TreeBuilder::default().build(&[], &HashMap::new(), &HashMap::new(), &ExpandState::new());
        assert!(nodes.is_empty());
    }

    #[test]
    fn rebuild_keeps_open_state() {
        let (projects, instruments) = fixtures();
        let builder = TreeBuilder::default();
        let mut expand = ExpandState::new();
        let visible = [ProjectId(24637), ProjectId(20151)];

        let first = builder.build(&visible, &projects, &instruments, &expand);
        assert!(first.iter().all(|n| !n.is_open()));

        assert!(expand.toggle(NodeKey::Project(ProjectId(24637))));
        let second = builder.build(&visible, &projects, &instruments, &expand);
        let third = builder.build(&visible, &projects, &instruments, &expand);
        assert!(second[0].is_open());
        assert!(!second[1].is_open());
        assert_eq!(second, third);
    }

    #[test]
    fn retain_projects_drops_only_vanished_keys() {
        let mut expand = ExpandState::new();
        expand.set(NodeKey::Project(ProjectId(1)), true);
        expand.set(NodeKey::Project(ProjectId(2)), true);
        expand.set(NodeKey::menu(GRAPHS_GROUP), true);

        expand.retain_projects(&[ProjectId(2)]);
        assert!(!expand.is_open(&NodeKey::Project(ProjectId(1))));
        assert!(expand.is_open(&NodeKey::Project(ProjectId(2))));
        assert!(expand.is_open(&NodeKey::menu(GRAPHS_GROUP)));
    }

    #[test]
    fn toggle_flips_state() {
        let mut expand = ExpandState::new();
        let key = NodeKey::menu(GRAPHS_GROUP);
        assert!(expand.toggle(key.clone()));
        assert!(!expand.toggle(key.clone()));
        assert!(!expand.is_open(&key));
    }

    #[test]
    fn menu_for_user_without_flags() {
        let menu = build_menu(&Principal::user("a@b.c"), Vec::new(), &ExpandState::new());
        assert_eq!(labels(&menu), vec!["Alarms", "Maps"]);
    }

    #[test]
    fn menu_for_admin_lists_everything() {
        let (projects, instruments) = fixtures();
        let project_nodes = TreeBuilder::default().build(
            &[ProjectId(24637)],
            &projects,
            &instruments,
            &ExpandState::new(),
        );
        let menu = build_menu(&Principal::admin("ops@dgmts.com"), project_nodes, &ExpandState::new());
        assert_eq!(
            labels(&menu),
            vec!["Projects", "Alarms", "Graphs", "Data Summary", "Maps", "File Manager", "Admin Setup"]
        );

        let graphs = &menu[2];
        assert_eq!(graphs.key(), Some(NodeKey::menu(GRAPHS_GROUP)));
        assert_eq!(
            labels(&graphs.children),
            vec!["Project Graphs", "Custom Graphs", "Long Bridge North"]
        );
        assert!(graphs.find_project(ProjectId(24637)).is_some());
    }

    #[test]
    fn menu_graphs_group_reads_expand_state() {
        let principal = Principal::user("a@b.c").with_permissions(PermissionFlags {
            view_graph: true,
            ..PermissionFlags::default()
        });
        let mut expand = ExpandState::new();
        expand.set(NodeKey::menu(GRAPHS_GROUP), true);

        let menu = build_menu(&principal, Vec::new(), &expand);
        assert_eq!(labels(&menu), vec!["Alarms", "Graphs", "Maps"]);
        assert!(menu[1].is_open());
    }

    #[test]
    fn node_serializes_with_kind_tag() {
        let node = NavigationNode::link("Maps", "/maps");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["entry"]["kind"], "link");
        assert_eq!(json["entry"]["route"], "/maps");
    }
}
