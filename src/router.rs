use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{check_combined, evaluate, resolve_escalation};
use crate::report::RoutingReport;
use crate::rules::RuleSet;
use crate::teams::{MessageFormatter, NotificationSink};
use crate::types::{Category, CombinedMatch, DispatchedAlert, IncomingEvent, Metrics, Priority, RoutedAlert};

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOutcome {
    pub routed: RoutedAlert,
    /// `None` when nothing was sent.
    pub delivered: Option<bool>,
}

/// Evaluates events against the rule tables and hands forwarded alerts to a sink.
pub struct AlertRouter<S: NotificationSink> {
    rules: Arc<RuleSet>,
    formatter: MessageFormatter,
    sink: S,
}

impl<S: NotificationSink> AlertRouter<S> {
    pub fn new(rules: Arc<RuleSet>, formatter: MessageFormatter, sink: S) -> Self {
        Self { rules, formatter, sink }
    }

    pub fn rules(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Decision, escalation tier and dashboards for `message`. No I/O.
    pub fn route(&self, message: &str, metrics: Option<&Metrics>) -> RoutedAlert {
        let decision = evaluate(&self.rules, message, metrics);
        let (escalation, dashboards) = match decision.category {
            Some(category) if decision.should_forward => (
                Some(resolve_escalation(&self.rules, message, category.as_str())),
                self.rules.dashboards_for(category).to_vec(),
            ),
            _ => (None, Vec::new()),
        };
        RoutedAlert {
            decision,
            escalation,
            dashboards,
        }
    }

    /// Route `message` and send it when the decision says so.
    pub async fn forward(&self, title: &str, message: &str, metrics: Option<&Metrics>) -> ForwardOutcome {
        let routed = self.route(message, metrics);
        let (priority, category) = match (routed.decision.should_forward, routed.decision.priority, routed.decision.category) {
            (true, Some(p), Some(c)) => (p, c),
            _ => {
                info!(event = message, "no alert trigger matched");
                return ForwardOutcome { routed, delivered: None };
            }
        };

        let body = match routed.escalation {
            Some(tier) => format!("{}\n\nEscalation: {}", message, tier),
            None => message.to_string(),
        };
        let notification = self.formatter.format(&self.rules, title, &body, category, priority, metrics);
        info!(
            %category,
            %priority,
            escalation = ?routed.escalation,
            sink = self.sink.name(),
            "forwarding alert"
        );
        let delivered = self.sink.send(&notification).await;
        if !delivered {
            warn!(%category, "alert was not delivered");
        }
        ForwardOutcome {
            routed,
            delivered: Some(delivered),
        }
    }

    /// Send a critical notification when a crisis scenario is active.
    pub async fn forward_combined(&self, active_conditions: &HashSet<String>) -> Option<(CombinedMatch, bool)> {
        let m = check_combined(&self.rules, active_conditions)?;
        let title = format!("Crisis scenario: {}", m.scenario.replace('_', " "));
        let mut conditions: Vec<&str> = active_conditions.iter().map(|s| s.as_str()).collect();
        conditions.sort_unstable();
        let body = format!(
            "Active conditions: {}\n\nAction: {}",
            conditions.join(", "),
            m.action
        );
        let notification = self
            .formatter
            .format(&self.rules, &title, &body, Category::Critical, Priority::High, None);
        info!(scenario = %m.scenario, "combined trigger active");
        let delivered = self.sink.send(&notification).await;
        Some((m, delivered))
    }

    /// Forward one feed event, then its crisis scenario if the listed
    /// conditions complete one, and tally both in `report`.
    pub async fn handle_event(&self, event: &IncomingEvent, report: &mut RoutingReport) {
        let outcome = self.forward(event.title(), &event.message, event.metrics.as_ref()).await;
        report.record_outcome(&outcome);

        if !event.conditions.is_empty() {
            let active: HashSet<String> = event.conditions.iter().map(|c| c.trim().to_lowercase()).collect();
            if let Some((m, delivered)) = self.forward_combined(&active).await {
                report.record_combined(&m, delivered);
            }
        }
    }

    pub async fn forward_scheduled(&self, alert: &DispatchedAlert) -> bool {
        let notification = self.formatter.format(
            &self.rules,
            &alert.title(),
            &alert.body(),
            alert.category,
            alert.priority,
            None,
        );
        self.sink.send(&notification).await
    }
}
