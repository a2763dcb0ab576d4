//! imSite command-line driver
//!
//! Runs navigation resolution and membership edits against a JSON store
//! snapshot, for inspecting configuration changes without the dashboard.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use imsite_model::{PermissionFlags, Principal, ProjectId, SiteConfig};
use imsite_nav::{
    plan_reconciliation, ExpandState, InstrumentClassifier, MembershipPlan, NavigationService,
    NodeKey, Reconciler,
};
use imsite_store::{MembershipStore, MemoryStore, SiteStore, StoreSnapshot};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .value_name("PATH")
        .help("Site configuration TOML (built-in defaults when omitted)");
    let data_arg = Arg::new("data")
        .long("data")
        .value_name("PATH")
        .required(true)
        .help("Store snapshot JSON");
    let email_arg = Arg::new("email")
        .long("email")
        .required(true)
        .help("User email");

    Command::new("imsite")
        .version(imsite_nav::VERSION)
        .about("imSite navigation and membership tooling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("classify")
                .about("Classify one instrument")
                .arg(config_arg.clone())
                .arg(Arg::new("id").required(true).help("Instrument identifier"))
                .arg(Arg::new("name").required(true).help("Instrument display name")),
        )
        .subcommand(
            Command::new("tree")
                .about("Resolve the sidebar for a user and print it as JSON")
                .arg(config_arg)
                .arg(data_arg.clone())
                .arg(email_arg.clone())
                .arg(
                    Arg::new("admin")
                        .long("admin")
                        .action(ArgAction::SetTrue)
                        .help("Resolve as an administrator"),
                )
                .arg(
                    Arg::new("grant")
                        .long("grant")
                        .action(ArgAction::Append)
                        .value_parser([
                            "access-to-site",
                            "view-graph",
                            "download-graph",
                            "view-data",
                            "download-data",
                        ])
                        .help("Permission flag for a non-admin user"),
                )
                .arg(
                    Arg::new("open")
                        .long("open")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(i64))
                        .help("Project id to render expanded"),
                ),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Replace a user's project memberships")
                .arg(data_arg)
                .arg(email_arg)
                .arg(
                    Arg::new("project")
                        .long("project")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(i64))
                        .help("Desired project id (repeat; none clears all)"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the plan without applying it"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .value_name("PATH")
                        .help("Write the resulting snapshot here"),
                ),
        )
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(args: &ArgMatches) -> Result<SiteConfig> {
    match args.get_one::<String>("config") {
        Some(path) => SiteConfig::load(path)
            .with_context(|| format!("loading site configuration from {path}")),
        None => Ok(SiteConfig::default()),
    }
}

fn load_store(path: &str) -> Result<MemoryStore> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading store snapshot {path}"))?;
    let snapshot = StoreSnapshot::from_json(&text)?;
    Ok(MemoryStore::from_snapshot(snapshot)?)
}

fn write_store(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.snapshot())?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

fn permissions(args: &ArgMatches) -> PermissionFlags {
    let mut flags = PermissionFlags::default();
    for grant in args.get_many::<String>("grant").into_iter().flatten() {
        match grant.as_str() {
            "access-to-site" => flags.access_to_site = true,
            "view-graph" => flags.view_graph = true,
            "download-graph" => flags.download_graph = true,
            "view-data" => flags.view_data = true,
            "download-data" => flags.download_data = true,
            _ => {}
        }
    }
    flags
}

fn principal(args: &ArgMatches) -> Result<Principal> {
    let email = required(args, "email")?;
    Ok(if args.get_flag("admin") {
        Principal::admin(email)
    } else {
        Principal::user(email).with_permissions(permissions(args))
    })
}

fn project_ids(args: &ArgMatches, name: &str) -> Vec<ProjectId> {
    args.get_many::<i64>(name)
        .into_iter()
        .flatten()
        .copied()
        .map(ProjectId)
        .collect()
}

fn classify(args: &ArgMatches) -> Result<()> {
    let classifier = InstrumentClassifier::new(Arc::new(load_config(args)?));
    let classification = classifier.classify(required(args, "id")?, required(args, "name")?);
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

async fn tree(args: &ArgMatches) -> Result<()> {
    let config = Arc::new(load_config(args)?);
    let store: Arc<dyn SiteStore> = Arc::new(load_store(required(args, "data")?)?);
    let principal = principal(args)?;

    let mut expand = ExpandState::new();
    expand.set(NodeKey::menu(imsite_nav::tree::GRAPHS_GROUP), true);
    for id in project_ids(args, "open") {
        expand.set(NodeKey::Project(id), true);
    }

    let service = NavigationService::new(config, store);
    let resolution = service.menu(&principal, &expand).await;
    if let Some(failure) = &resolution.failure {
        tracing::warn!("projects omitted: {}", failure);
    }
    println!("{}", serde_json::to_string_pretty(&resolution.value)?);
    Ok(())
}

async fn reconcile(args: &ArgMatches) -> Result<()> {
    let data = required(args, "data")?;
    let email = required(args, "email")?;
    let desired = project_ids(args, "project");
    let store = Arc::new(load_store(data)?);

    if args.get_flag("dry-run") {
        let current = store.memberships_by_user(email).await?;
        match plan_reconciliation(email, &current, &desired) {
            MembershipPlan::Unchanged => println!("{email}: memberships unchanged"),
            MembershipPlan::Replace(replacement) => println!(
                "{email}: retract {:?}, insert {:?}",
                replacement.retract, replacement.insert
            ),
        }
        return Ok(());
    }

    let reconciler = Reconciler::new(store.clone());
    let outcome = reconciler.reconcile_user(email, &desired).await?;
    println!("{email}: {outcome:?}");

    if let Some(path) = args.get_one::<String>("write") {
        write_store(&store, Path::new(path))?;
        tracing::info!(path = %path, "wrote snapshot");
    }
    Ok(())
}

async fn run(matches: ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("classify", args)) => classify(args),
        Some(("tree", args)) => tree(args).await,
        Some(("reconcile", args)) => reconcile(args).await,
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("no command given"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(cli().get_matches()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
