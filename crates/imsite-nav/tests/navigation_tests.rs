use imsite_model::{IconCategory, PermissionFlags, Principal, ProjectId, SiteConfig};
use imsite_nav::{
    CommitOutcome, ExpandState, LookupStage, NavigationNode, NavigationService, NodeEntry,
    NodeKey, ResolutionSession,
};
use imsite_store::{MemoryStore, SiteStore};
use imsite_test_utils::{
    admin, field_user, init_tracing, seeded_store, site_config, unavailable, FaultyStore,
    StoreOp, ANC_DAR_BC, DGMTS_TESTING, FIELD_EMAIL, LONG_BRIDGE,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn service_over(store: Arc<FaultyStore<MemoryStore>>) -> NavigationService {
    let store: Arc<dyn SiteStore> = store;
    NavigationService::new(site_config(), store)
}

fn labels(nodes: &[NavigationNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.label.as_str()).collect()
}

fn graphs(menu: &[NavigationNode]) -> &NavigationNode {
    menu.iter()
        .find(|n| n.label == "Graphs")
        .expect("graphs group present")
}

#[tokio::test]
async fn test_admin_sees_allow_list_in_order() {
    init_tracing();
    let store = Arc::new(FaultyStore::new(seeded_store()));
    let service = service_over(store.clone());

    let nodes = service
        .try_project_nodes(&admin(), &ExpandState::new())
        .await
        .unwrap();

    assert_eq!(
        labels(&nodes),
        vec!["Long Bridge North", "DGMTS Testing", "ANC DAR-BC"]
    );
    // Admin visibility never consults memberships
    assert_eq!(store.call_count(StoreOp::MembershipsByUser), 0);
    // Allow-listed project with no instruments still gets a node
    assert!(nodes[1].children.is_empty());
}

#[tokio::test]
async fn test_member_sees_granted_allow_listed_projects() {
    let service = service_over(Arc::new(FaultyStore::new(seeded_store())));

    let nodes = service
        .try_project_nodes(&field_user(), &ExpandState::new())
        .await
        .unwrap();

    // 30000 is granted but not allow-listed
    assert_eq!(labels(&nodes), vec!["Long Bridge North", "ANC DAR-BC"]);
}

#[tokio::test]
async fn test_unidentified_principals_see_nothing() {
    let store = Arc::new(FaultyStore::new(seeded_store()));
    let service = service_over(store.clone());

    for principal in [
        Principal::anonymous(),
        Principal::user("   "),
        Principal::admin(""),
    ] {
        let nodes = service
            .try_project_nodes(&principal, &ExpandState::new())
            .await
            .unwrap();
        assert!(nodes.is_empty(), "{principal:?} should see nothing");
    }
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_instruments_are_classified_in_tree() {
    let service = service_over(Arc::new(FaultyStore::new(seeded_store())));

    let nodes = service
        .try_project_nodes(&admin(), &ExpandState::new())
        .await
        .unwrap();
    let long_bridge = nodes[0].find_project(LONG_BRIDGE).unwrap();

    let routes: Vec<&str> = long_bridge
        .children
        .iter()
        .map(|n| n.route().unwrap().as_str())
        .collect();
    assert_eq!(
        routes,
        vec![
            "/background",
            "/amts-track-graphs",
            "/amts-ref-graphs",
            "/tiltmeter-142939"
        ]
    );

    let anc = nodes[2].find_project(ANC_DAR_BC).unwrap();
    let unknown = &anc.children[1];
    assert_eq!(unknown.label, "Unknown Device");
    assert!(!unknown.is_navigable());
    let NodeEntry::Instrument { classification, .. } = &unknown.entry else {
        panic!("expected instrument entry");
    };
    assert_eq!(classification.route, "#");
    assert_eq!(classification.icon, IconCategory::Default);
}

#[tokio::test]
async fn test_expand_state_survives_rebuild() {
    let service = service_over(Arc::new(FaultyStore::new(seeded_store())));
    let mut expand = ExpandState::new();
    expand.set(NodeKey::Project(ANC_DAR_BC), true);
    expand.set(NodeKey::menu("graphs"), true);

    let first = service.menu(&admin(), &expand).await.value;
    let second = service.menu(&admin(), &expand).await.value;
    assert_eq!(first, second);

    let group = graphs(&second);
    assert!(group.is_open());
    assert!(group.find_project(ANC_DAR_BC).unwrap().is_open());
    assert!(!group.find_project(LONG_BRIDGE).unwrap().is_open());
}

#[tokio::test]
async fn test_failed_instrument_read_degrades_to_empty_projects() {
    init_tracing();
    let store = Arc::new(
        FaultyStore::new(seeded_store()).fail_always(StoreOp::InstrumentsByProject, unavailable()),
    );
    let service = service_over(store);

    let resolution = service.menu(&admin(), &ExpandState::new()).await;

    let failure = resolution.failure.clone().expect("failure reported");
    assert!(matches!(failure.stage, LookupStage::Instruments(_)));
    assert_eq!(failure.source, unavailable());

    // Menu still renders, without any project node
    let menu = resolution.value;
    assert!(labels(&menu).contains(&"Maps"));
    assert!(labels(&menu).contains(&"Admin Setup"));
    assert_eq!(
        labels(&graphs(&menu).children),
        vec!["Project Graphs", "Custom Graphs"]
    );
}

#[tokio::test]
async fn test_failed_membership_read_degrades_member_only() {
    let store = Arc::new(
        FaultyStore::new(seeded_store()).fail_always(StoreOp::MembershipsByUser, unavailable()),
    );
    let service = service_over(store);

    let member = service.project_nodes(&field_user(), &ExpandState::new()).await;
    assert!(member.is_degraded());
    assert!(member.value.is_empty());
    assert_eq!(member.failure.unwrap().stage, LookupStage::Memberships);

    let full = service.project_nodes(&admin(), &ExpandState::new()).await;
    assert!(!full.is_degraded());
    assert_eq!(full.value.len(), 3);
}

#[tokio::test]
async fn test_menu_follows_permission_flags() {
    let service = service_over(Arc::new(FaultyStore::new(seeded_store())));
    let viewer = Principal::user(FIELD_EMAIL).with_permissions(PermissionFlags {
        view_data: true,
        ..PermissionFlags::default()
    });

    let menu = service.menu(&viewer, &ExpandState::new()).await.value;
    assert_eq!(
        labels(&menu),
        vec!["Alarms", "Data Summary", "Maps", "File Manager"]
    );

    let menu = service.menu(&admin(), &ExpandState::new()).await.value;
    assert_eq!(
        labels(&menu),
        vec![
            "Projects",
            "Alarms",
            "Graphs",
            "Data Summary",
            "Maps",
            "File Manager",
            "Admin Setup"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_latest_refresh_wins() {
    init_tracing();
    let store = Arc::new(
        FaultyStore::new(seeded_store())
            .delay(StoreOp::MembershipsByUser, Duration::from_millis(100)),
    );
    let service = service_over(store);
    let session = ResolutionSession::new();
    let expand = ExpandState::new();

    let member = field_user();
    let operator = admin();
    let (slow, fast) = tokio::join!(
        service.refresh(&session, &member, &expand),
        service.refresh(&session, &operator, &expand),
    );

    assert_eq!(fast.commit, CommitOutcome::Applied);
    assert_eq!(slow.commit, CommitOutcome::Discarded);
    let current = session.current();
    assert!(labels(&current).contains(&"Admin Setup"));
    assert!(graphs(&current).find_project(DGMTS_TESTING).is_some());
}

#[tokio::test]
async fn test_signing_out_clears_tree() {
    let service = service_over(Arc::new(FaultyStore::new(seeded_store())));
    let session = ResolutionSession::new();

    service
        .refresh(&session, &admin(), &ExpandState::new())
        .await;
    assert!(!session.current().is_empty());

    session.clear();
    assert!(session.current().is_empty());
}

#[tokio::test]
async fn test_empty_allow_list_shows_no_projects() {
    let config = Arc::new(SiteConfig::default().with_allow_list(Vec::<ProjectId>::new()));
    let store: Arc<dyn SiteStore> = Arc::new(seeded_store());
    let service = NavigationService::new(config, store);

    let nodes = service
        .try_project_nodes(&admin(), &ExpandState::new())
        .await
        .unwrap();
    assert!(nodes.is_empty());
}
