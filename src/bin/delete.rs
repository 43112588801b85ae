use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use grafana_provisioner::{
    CascadeDelete, GrafanaClient,
    config::ProvisionerConfig,
    remote::{HttpApi, MemoryApi, RemoteApi},
    util::DASHBOARD_UID,
};
use tracing::{error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Uid of the dashboard to delete
    #[arg(env = DASHBOARD_UID)]
    uid: String,

    /// TOML config file (default: ~/.config/grafana-provisioner/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist progress here and resume from it
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Run against an empty in-memory remote and print the calls that would be made
    #[arg(long)]
    dry_run: bool,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::DEBUG
    };
    let filter = filter::Targets::new().with_targets(vec![
        ("grafana_provisioner", level),
        ("delete_dashboard", level),
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
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let cascade = resume_or_start(&args.uid, args.journal.as_deref())?;

    if args.dry_run {
        let client = GrafanaClient::new(MemoryApi::new());
        run(cascade, &client, args.journal.as_deref()).await?;
        for call in client.api().calls() {
            println!("{} {}", call.method, call.path);
        }
        return Ok(());
    }

    let config = ProvisionerConfig::load(args.config.as_deref()).context("invalid configuration")?;
    let client = GrafanaClient::new(HttpApi::from_config(&config)?);
    run(cascade, &client, args.journal.as_deref()).await
}

fn resume_or_start(uid: &str, journal: Option<&Path>) -> anyhow::Result<CascadeDelete> {
    let Some(path) = journal else {
        return Ok(CascadeDelete::new(uid));
    };

    match CascadeDelete::load(path)? {
        Some(cascade) if cascade.dashboard_uid() == uid => {
            info!(
                "resuming cascade of {uid} at '{}' (last update {})",
                cascade.state(),
                cascade.updated_at()
            );
            Ok(cascade)
        }
        Some(cascade) => anyhow::bail!(
            "journal {} belongs to dashboard {}, not {uid}",
            path.display(),
            cascade.dashboard_uid()
        ),
        None => Ok(CascadeDelete::new(uid)),
    }
}

async fn run<A: RemoteApi>(
    mut cascade: CascadeDelete,
    client: &GrafanaClient<A>,
    journal: Option<&Path>,
) -> anyhow::Result<()> {
    let uid = cascade.dashboard_uid().to_string();

    let result = cascade
        .run(client, |progress| {
            if let Some(path) = journal
                && let Err(e) = progress.save(path)
            {
                error!("{e:#}");
            }
        })
        .await;

    if let Err(e) = result {
        if journal.is_some() {
            warn!("cascade of {uid} stopped at '{}'; run again to resume", cascade.state());
        }
        return Err(e).with_context(|| format!("failed to delete dashboard {uid}"));
    }

    if let Some(path) = journal {
        std::fs::remove_file(path)
            .with_context(|| format!("failed to remove journal: {}", path.display()))?;
    }
    println!("deleted dashboard {uid} with its alert rules and notification routes");
    Ok(())
}
