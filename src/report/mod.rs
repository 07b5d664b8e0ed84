use std::collections::BTreeMap;

use crate::router::ForwardOutcome;
use crate::types::{CombinedMatch, DispatchedAlert, Priority};

/// Running tally of everything the router did during one process lifetime.
#[derive(Debug, Default)]
pub struct RoutingReport {
    pub forwarded: usize,
    pub suppressed: usize,
    pub delivered: usize,
    pub failed: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub scenarios: Vec<String>,
    pub scheduled: Vec<String>,
}

impl RoutingReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&mut self, outcome: &ForwardOutcome) {
        match outcome.delivered {
            None => self.suppressed += 1,
            Some(ok) => {
                self.forwarded += 1;
                self.record_delivery(ok);
                if let Some(p) = outcome.routed.decision.priority {
                    *self.by_priority.entry(p).or_insert(0) += 1;
                }
            }
        }
    }

    pub fn record_combined(&mut self, m: &CombinedMatch, delivered: bool) {
        self.forwarded += 1;
        self.record_delivery(delivered);
        *self.by_priority.entry(Priority::High).or_insert(0) += 1;
        self.scenarios.push(m.scenario.clone());
    }

    pub fn record_scheduled(&mut self, alert: &DispatchedAlert, delivered: bool) {
        self.forwarded += 1;
        self.record_delivery(delivered);
        *self.by_priority.entry(alert.priority).or_insert(0) += 1;
        self.scheduled.push(format!("{}@{}", alert.trigger, alert.slot));
    }

    /// Fold in the tally kept by another delivery worker.
    pub fn merge(&mut self, other: RoutingReport) {
        self.forwarded += other.forwarded;
        self.suppressed += other.suppressed;
        self.delivered += other.delivered;
        self.failed += other.failed;
        for (p, n) in other.by_priority {
            *self.by_priority.entry(p).or_insert(0) += n;
        }
        self.scenarios.extend(other.scenarios);
        self.scheduled.extend(other.scheduled);
    }

    fn record_delivery(&mut self, ok: bool) {
        if ok {
            self.delivered += 1;
        } else {
            self.failed += 1;
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            forwarded: self.forwarded,
            suppressed: self.suppressed,
            delivered: self.delivered,
            failed: self.failed,
            high: self.count(Priority::High),
            medium: self.count(Priority::Medium),
            low: self.count(Priority::Low),
        }
    }

    fn count(&self, p: Priority) -> usize {
        self.by_priority.get(&p).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub forwarded: usize,
    pub suppressed: usize,
    pub delivered: usize,
    pub failed: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ReportSummary {
    pub fn total_events(&self) -> usize {
        self.forwarded + self.suppressed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
