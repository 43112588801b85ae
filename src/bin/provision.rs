use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use grafana_provisioner::{
    GrafanaClient, Provisioner,
    config::ProvisionerConfig,
    model::{datasource::ZABBIX_DATASOURCE_TYPE, to_canonical_json},
    plan::{ProvisioningPlan, read_plan_file},
    remote::{HttpApi, MemoryApi, RemoteApi},
};
use serde_json::json;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// Folder uid used when a dry run has to resolve a folder title
const DRY_RUN_FOLDER_UID: &str = "dry-run-folder";

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Plan file
    #[arg(short)]
    file: PathBuf,

    /// TOML config file (default: ~/.config/grafana-provisioner/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against an in-memory remote and print the calls that would be made
    #[arg(long)]
    dry_run: bool,

    /// Write the rendered documents to this directory instead of publishing
    #[arg(long, value_name = "DIR")]
    render: Option<PathBuf>,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    dotenv::dotenv().ok();

    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("grafana_provisioner", level),
        ("provision_dashboard", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let plan = read_plan_file(&args.file)?;

    if let Some(dir) = &args.render {
        return render(&plan, dir);
    }

    if args.dry_run {
        return dry_run(&plan).await;
    }

    let config = ProvisionerConfig::load(args.config.as_deref()).context("invalid configuration")?;
    let api = HttpApi::from_config(&config)?;
    let client = GrafanaClient::new(api).with_zabbix_datasource_type(&config.zabbix_datasource_type);

    provision(&Provisioner::new(client), &plan).await
}

async fn provision<A: RemoteApi>(provisioner: &Provisioner<A>, plan: &ProvisioningPlan) -> anyhow::Result<()> {
    let report = provisioner
        .provision(plan)
        .await
        .with_context(|| format!("failed to provision dashboard '{}'", plan.dashboard.title))?;

    println!("dashboard: {} {}", report.dashboard_uid, report.dashboard_url);
    for uid in &report.rule_uids {
        println!("alert rule: {uid}");
    }
    println!("notification routes: {}", report.route_count);
    Ok(())
}

async fn dry_run(plan: &ProvisioningPlan) -> anyhow::Result<()> {
    let mut api = MemoryApi::new();
    if let Some(title) = &plan.folder_title {
        api = api.with_folder(DRY_RUN_FOLDER_UID, title);
    }
    if plan.alerts.iter().any(|alert| alert.datasource_uid.is_none()) {
        api = api.with_datasource(json!({
            "uid": "dry-run-zabbix",
            "name": "Zabbix (dry run)",
            "type": ZABBIX_DATASOURCE_TYPE
        }));
    }

    let provisioner = Provisioner::new(GrafanaClient::new(api));
    provision(&provisioner, plan).await?;

    for call in provisioner.client().api().calls() {
        println!("{} {}", call.method, call.path);
    }
    Ok(())
}

fn render(plan: &ProvisioningPlan, dir: &Path) -> anyhow::Result<()> {
    let documents = plan.render_documents().context("plan cannot be rendered offline")?;

    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for (name, document) in documents {
        let path = dir.join(&name);
        std::fs::write(&path, to_canonical_json(&document))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("rendered {}", path.display());
    }
    Ok(())
}
