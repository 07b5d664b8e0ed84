use chrono::{Datelike, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::AlertError;
use crate::rules::{weekday_name, RuleSet, ScheduleSpec};
use crate::types::{Category, DispatchedAlert, Priority};

/// Longest gap between ticks that still sees every minute.
const MAX_TICK_GAP_SECS: i64 = 60;

/// Fires scheduled dashboard bundles at fixed wall-clock times.
///
/// Matching is exact on `HH:MM` (or `<Weekday> HH:MM`), so the dispatcher
/// must be ticked more often than once a minute. Each trigger fires at most
/// once per slot even when several ticks land in the same minute. Run a
/// single dispatcher per deployment; this type does not coordinate between
/// processes.
pub struct ScheduledDispatcher {
    rules: Arc<RuleSet>,
    last_fired: HashMap<String, String>,
    last_tick: Option<NaiveDateTime>,
}

impl ScheduledDispatcher {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            last_fired: HashMap::new(),
            last_tick: None,
        }
    }

    /// Alerts due at local time `now`.
    pub fn tick(&mut self, now: NaiveDateTime) -> Vec<DispatchedAlert> {
        if let Some(prev) = self.last_tick {
            let gap_secs = (now - prev).num_seconds();
            if gap_secs > MAX_TICK_GAP_SECS {
                let drift = AlertError::SchedulingDrift { gap_secs };
                warn!(error = %drift, "dispatcher fell behind");
            }
        }
        self.last_tick = Some(now);

        let hhmm = now.format("%H:%M").to_string();
        let day_time = format!("{} {}", weekday_name(now.weekday()), hhmm);
        let slot_key = now.format("%Y-%m-%d %H:%M").to_string();

        let mut dispatched = Vec::new();
        for trigger in &self.rules.schedules {
            let due = match &trigger.schedule {
                ScheduleSpec::Times(times) => times.iter().any(|t| *t == hhmm),
                ScheduleSpec::Weekly(slot) => *slot == day_time,
            };
            if !due {
                continue;
            }
            if self.last_fired.get(&trigger.name) == Some(&slot_key) {
                continue;
            }
            self.last_fired.insert(trigger.name.clone(), slot_key.clone());

            info!(trigger = %trigger.name, slot = %hhmm, dashboards = trigger.dashboards.len(), "scheduled alert due");
            dispatched.push(DispatchedAlert {
                trigger: trigger.name.clone(),
                slot: match &trigger.schedule {
                    ScheduleSpec::Times(_) => hhmm.clone(),
                    ScheduleSpec::Weekly(_) => day_time.clone(),
                },
                priority: Priority::Low,
                category: Category::Operations,
                dashboards: trigger.dashboards.clone(),
            });
        }
        dispatched
    }
}

/// Tick `dispatcher` every `every` on its own task and queue what it fires.
///
/// Nothing on this task waits for delivery, so a slow sink cannot push a
/// tick past its minute. The task ends when the receiver is dropped.
pub fn spawn_dispatcher<C>(
    mut dispatcher: ScheduledDispatcher,
    every: Duration,
    clock: C,
    tx: UnboundedSender<DispatchedAlert>,
) -> JoinHandle<()>
where
    C: Fn() -> NaiveDateTime + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            for alert in dispatcher.tick(clock()) {
                if tx.send(alert).is_err() {
                    debug!("scheduled alert queue closed, dispatcher stopping");
                    return;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    fn dispatcher() -> ScheduledDispatcher {
        ScheduledDispatcher::new(Arc::new(RuleSet::lab_defaults().unwrap()))
    }

    #[test]
    fn test_exact_minute_only() {
        // 2024-03-05 is a Tuesday
        let mut d = dispatcher();
        let fired = d.tick(at(2024, 3, 5, 6, 45, 0));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].trigger, "shift_reports");
        assert_eq!(fired[0].priority, Priority::Low);
        assert_eq!(fired[0].category, Category::Operations);
        assert_eq!(fired[0].dashboards, vec!["shift_summary", "staffing_board", "tat_performance"]);

        assert!(d.tick(at(2024, 3, 5, 6, 46, 0)).is_empty());
    }

    #[test]
    fn test_same_minute_fires_once() {
        let mut d = dispatcher();
        assert_eq!(d.tick(at(2024, 3, 5, 14, 45, 1)).len(), 1);
        assert!(d.tick(at(2024, 3, 5, 14, 45, 31)).is_empty());
        // Next day's slot fires again
        assert_eq!(d.tick(at(2024, 3, 6, 14, 45, 2)).len(), 1);
    }

    #[test]
    fn test_weekly_slot() {
        // 2024-03-04 is a Monday
        let mut d = dispatcher();
        let fired = d.tick(at(2024, 3, 4, 9, 0, 0));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].trigger, "weekly_review");
        assert_eq!(fired[0].slot, "Monday 09:00");

        let mut d = dispatcher();
        assert!(d.tick(at(2024, 3, 5, 9, 0, 0)).is_empty());
    }

    #[test]
    fn test_multiple_triggers_share_a_slot() {
        let mut rules = RuleSet::lab_defaults().unwrap();
        rules.schedules.push(
            crate::rules::ScheduledTrigger::daily("extra", &["07:00"], &["extra_board"]).unwrap(),
        );
        let mut d = ScheduledDispatcher::new(Arc::new(rules));
        let fired = d.tick(at(2024, 3, 5, 7, 0, 0));
        let names: Vec<&str> = fired.iter().map(|a| a.trigger.as_str()).collect();
        assert_eq!(names, vec!["daily_summary", "extra"]);
    }

    #[test]
    fn test_alert_text() {
        let mut d = dispatcher();
        let fired = d.tick(at(2024, 3, 5, 8, 0, 0));
        assert_eq!(fired[0].title(), "Scheduled update: qc review");
        assert_eq!(fired[0].body(), "Dashboards due at 08:00: qc_dashboard");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_dispatcher_fires_on_its_own_task() {
        let base = at(2024, 3, 5, 6, 44, 40);
        let start = tokio::time::Instant::now();
        let clock = move || base + chrono::Duration::from_std(start.elapsed()).unwrap();

        // Something else on the runtime holds a long await
        let busy = tokio::spawn(tokio::time::sleep(Duration::from_secs(600)));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = spawn_dispatcher(dispatcher(), Duration::from_secs(30), clock, tx);

        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.trigger, "shift_reports");
        assert_eq!(alert.slot, "06:45");
        assert!(start.elapsed() < Duration::from_secs(31));
        assert!(!busy.is_finished());

        drop(rx);
        handle.abort();
    }
}
