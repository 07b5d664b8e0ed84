use crate::parsing::matches;
use crate::rules::RuleSet;
use crate::types::EscalationTier;

/// Categories that go straight to a manager when no escalation phrase matches.
const MANAGER_DEFAULT_CATEGORIES: &[&str] = &["critical", "incident", "regulatory", "patient"];

/// Pick the organizational tier to notify for `message`.
///
/// Tiers are scanned in declared order and the first phrase hit wins;
/// otherwise the category decides. `category` is a plain string so callers
/// can pass labels that are not table categories.
pub fn resolve_escalation(rules: &RuleSet, message: &str, category: &str) -> EscalationTier {
    for rule in &rules.escalation {
        if rule.phrases.iter().any(|p| matches(message, p)) {
            return rule.tier;
        }
    }

    let category = category.trim().to_lowercase();
    if MANAGER_DEFAULT_CATEGORIES.contains(&category.as_str()) {
        EscalationTier::ManagerNotification
    } else {
        EscalationTier::ImmediateSupervisor
    }
}
