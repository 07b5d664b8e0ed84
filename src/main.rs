use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{info, warn};

use lab_alert_router::{
    load_config, run_service, AlertRouter, Config, LogSink, MessageFormatter, NotificationSink,
    RoutingReport, RuleSet, TeamsNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cfg = load_config()?;
    // Malformed tables are fatal before anything is read or sent.
    let rules = Arc::new(RuleSet::lab_defaults().context("Invalid alert rule tables")?);
    info!(
        categories = rules.categories.len(),
        schedules = rules.schedules.len(),
        dry_run = cfg.is_dry_run(),
        "alert rules loaded"
    );

    let formatter = MessageFormatter::from_config(&cfg);
    let report = match cfg.teams_webhook_url.as_deref() {
        Some(url) if !cfg.dry_run => {
            let sink = TeamsNotifier::from_config(&cfg, url)?;
            serve(&cfg, AlertRouter::new(rules, formatter, sink)).await?
        }
        _ => serve(&cfg, AlertRouter::new(rules, formatter, LogSink)).await?,
    };

    let summary = report.summary();
    info!(
        events = summary.total_events(),
        forwarded = summary.forwarded,
        suppressed = summary.suppressed,
        delivered = summary.delivered,
        failed = summary.failed,
        "alert router stopped"
    );
    if summary.has_failures() {
        warn!("{} alerts were dropped after delivery retries", summary.failed);
    }

    Ok(())
}

/// Read events from stdin and dispatch scheduled alerts until Ctrl-C.
async fn serve<S: NotificationSink + 'static>(cfg: &Config, router: AlertRouter<S>) -> Result<RoutingReport> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C, stopping");
        }
    };
    run_service(
        cfg,
        Arc::new(router),
        BufReader::new(tokio::io::stdin()),
        || chrono::Local::now().naive_local(),
        shutdown,
    )
    .await
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}
