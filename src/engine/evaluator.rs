use tracing::debug;

use crate::parsing::{any_violates, matches};
use crate::rules::RuleSet;
use crate::types::{AlertDecision, Category, Metrics, Priority};

/// Decide whether `message` warrants an alert.
///
/// Checks run in a fixed order and the first hit wins: immediate phrases,
/// escalation phrases, category keywords (in table order), trend phrases.
/// A keyword in a medium or low category only forwards when the supplied
/// metrics violate one of that category's thresholds.
pub fn evaluate(rules: &RuleSet, message: &str, metrics: Option<&Metrics>) -> AlertDecision {
    if message.trim().is_empty() {
        return AlertDecision::none();
    }

    if let Some(phrase) = first_match(message, &rules.triggers.immediate_alert) {
        debug!(phrase, "immediate alert phrase matched");
        return AlertDecision::forward(Priority::High, Category::Critical);
    }

    if let Some(phrase) = first_match(message, &rules.triggers.escalation_required) {
        debug!(phrase, "escalation phrase matched");
        return AlertDecision::forward(Priority::High, Category::Escalation);
    }

    for cat in &rules.categories {
        for keyword in &cat.keywords {
            if !matches(message, keyword) {
                continue;
            }
            if let Some(m) = metrics {
                if any_violates(&cat.thresholds, m) {
                    debug!(category = %cat.category, keyword = %keyword, "keyword matched with threshold violation");
                    return AlertDecision::forward(cat.priority, cat.category);
                }
            }
            if cat.priority == Priority::High {
                debug!(category = %cat.category, keyword = %keyword, "high priority keyword matched");
                return AlertDecision::forward(Priority::High, cat.category);
            }
        }
    }

    if let Some(phrase) = first_match(message, &rules.triggers.trend_alerts) {
        debug!(phrase, "trend phrase matched");
        return AlertDecision::forward(Priority::Medium, Category::Trend);
    }

    AlertDecision::none()
}

fn first_match<'a>(message: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases.iter().find(|p| matches(message, p)).map(|p| p.as_str())
}
