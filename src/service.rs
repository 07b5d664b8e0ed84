use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::report::RoutingReport;
use crate::router::AlertRouter;
use crate::scheduler::{spawn_dispatcher, ScheduledDispatcher};
use crate::teams::NotificationSink;
use crate::types::{Config, DispatchedAlert, IncomingEvent};

/// Parse one line of the NDJSON feed. Blank lines are skipped silently,
/// malformed ones with a warning.
pub fn parse_event(line: &str) -> Option<IncomingEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "skipping malformed event");
            None
        }
    }
}

/// Route queued feed events one at a time until the queue closes.
pub async fn deliver_events<S: NotificationSink>(
    router: Arc<AlertRouter<S>>,
    mut rx: UnboundedReceiver<IncomingEvent>,
) -> RoutingReport {
    let mut report = RoutingReport::new();
    while let Some(event) = rx.recv().await {
        router.handle_event(&event, &mut report).await;
    }
    report
}

/// Send queued scheduled alerts until the dispatcher stops.
pub async fn deliver_scheduled<S: NotificationSink>(
    router: Arc<AlertRouter<S>>,
    mut rx: UnboundedReceiver<DispatchedAlert>,
) -> RoutingReport {
    let mut report = RoutingReport::new();
    while let Some(alert) = rx.recv().await {
        let delivered = router.forward_scheduled(&alert).await;
        report.record_scheduled(&alert, delivered);
    }
    report
}

/// Run the router until `shutdown` resolves.
///
/// Feed lines from `input` and scheduled alerts each go to their own
/// delivery worker, so neither the reader nor the dispatcher ticker waits
/// on a sink. The feed closing does not stop scheduled dispatch. On
/// shutdown each worker gets [`Config::delivery_budget`] to finish what it
/// holds; a worker still busy after that is abandoned along with its tally.
pub async fn run_service<S, R, C, F>(
    cfg: &Config,
    router: Arc<AlertRouter<S>>,
    input: R,
    clock: C,
    shutdown: F,
) -> Result<RoutingReport>
where
    S: NotificationSink + 'static,
    R: AsyncBufRead + Unpin,
    C: Fn() -> NaiveDateTime + Send + 'static,
    F: Future<Output = ()>,
{
    let (alert_tx, alert_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let ticker = spawn_dispatcher(
        ScheduledDispatcher::new(Arc::clone(router.rules())),
        Duration::from_secs(cfg.dispatch_interval_secs),
        clock,
        alert_tx,
    );
    let scheduled = tokio::spawn(deliver_scheduled(Arc::clone(&router), alert_rx));
    let events = tokio::spawn(deliver_events(Arc::clone(&router), event_rx));

    tokio::pin!(shutdown);
    let mut lines = input.lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read event feed")? {
                    Some(line) => {
                        if let Some(event) = parse_event(&line) {
                            let _ = event_tx.send(event);
                        }
                    }
                    None => {
                        info!("event feed closed, scheduled dispatch continues");
                        input_open = false;
                    }
                }
            }
        }
    }

    ticker.abort();
    drop(event_tx);

    let budget = cfg.delivery_budget();
    let mut report = RoutingReport::new();
    for (worker, handle) in [("events", events), ("scheduled", scheduled)] {
        if let Some(tally) = drain(worker, handle, budget).await {
            report.merge(tally);
        }
    }
    Ok(report)
}

async fn drain(worker: &str, handle: JoinHandle<RoutingReport>, budget: Duration) -> Option<RoutingReport> {
    match tokio::time::timeout(budget, handle).await {
        Ok(Ok(tally)) => Some(tally),
        Ok(Err(e)) => {
            warn!(worker, error = %e, "delivery worker failed");
            None
        }
        Err(_) => {
            warn!(worker, budget_secs = budget.as_secs(), "delivery worker still busy at shutdown, abandoning queued alerts");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_with_env, MockEnvironment};
    use crate::rules::RuleSet;
    use crate::teams::MessageFormatter;
    use crate::types::StructuredMessage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tokio::io::BufReader;
    use tokio::time::Instant;

    /// Delivers scheduled updates at once and holds every other message
    /// for `delay`.
    struct StallingSink {
        delay: Duration,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for StallingSink {
        async fn send(&self, message: &StructuredMessage) -> bool {
            if !message.title.starts_with("Scheduled update") {
                tokio::time::sleep(self.delay).await;
            }
            self.sent.lock().unwrap().push(message.title.clone());
            true
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    fn router(delay: Duration) -> Arc<AlertRouter<StallingSink>> {
        Arc::new(AlertRouter::new(
            Arc::new(RuleSet::lab_defaults().unwrap()),
            MessageFormatter::new("test", "https://dash"),
            StallingSink { delay, sent: Mutex::new(Vec::new()) },
        ))
    }

    fn cfg() -> Config {
        load_config_with_env(&MockEnvironment::new()).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    const CRISIS_LINE: &[u8] = br#"{"message": "Small spill at the centrifuge", "conditions": ["short staffed", "high volume", "multiple instruments down"]}
"#;

    #[test]
    fn test_parse_event_skips_blank_and_malformed() {
        assert!(parse_event("   ").is_none());
        assert!(parse_event("not json").is_none());
        assert!(parse_event(r#"{"title": "no message"}"#).is_none());
        let ev = parse_event(r#"  {"message": "LIS down"}  "#).unwrap();
        assert_eq!(ev.message, "LIS down");
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_slot_fires_while_event_delivery_stalls() {
        let router = router(Duration::from_secs(3600));
        let start = Instant::now();
        let base = at(6, 44, 40);
        let clock = move || base + chrono::Duration::from_std(start.elapsed()).unwrap();

        let report = run_service(
            &cfg(),
            Arc::clone(&router),
            BufReader::new(CRISIS_LINE),
            clock,
            tokio::time::sleep(Duration::from_secs(90)),
        )
        .await
        .unwrap();

        assert_eq!(report.scheduled, vec!["shift_reports@06:45"]);
        assert_eq!(report.delivered, 1);
        let sent = router.sink().sent.lock().unwrap();
        assert_eq!(sent.as_slice(), ["Scheduled update: shift reports".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_stalled_delivery() {
        let router = router(Duration::from_secs(3600));
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            let _ = stop_tx.send(());
        });

        let start = Instant::now();
        let base = at(3, 17, 0);
        let report = run_service(
            &cfg(),
            Arc::clone(&router),
            BufReader::new(CRISIS_LINE),
            move || base,
            async {
                let _ = stop_rx.await;
            },
        )
        .await
        .unwrap();

        // 5 s until the stop plus at most one delivery budget
        assert!(start.elapsed() <= Duration::from_secs(5) + cfg().delivery_budget());
        assert_eq!(report.delivered, 0);
        assert!(router.sink().sent.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_events_are_routed_and_tallied() {
        let router = router(Duration::ZERO);
        let feed: &[u8] = b"not json\n\n{\"message\": \"Coffee machine restocked\"}\n{\"message\": \"LIS down\", \"title\": \"LIS\"}\n";
        let base = at(3, 17, 0);

        let report = run_service(
            &cfg(),
            Arc::clone(&router),
            BufReader::new(feed),
            move || base,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .unwrap();

        assert_eq!(report.suppressed, 1);
        assert_eq!(report.forwarded, 1);
        assert_eq!(report.delivered, 1);
        assert!(report.scheduled.is_empty());
        assert_eq!(router.sink().sent.lock().unwrap().as_slice(), ["LIS".to_string()]);
    }
}
