use std::collections::HashSet;

use crate::rules::RuleSet;
use crate::types::CombinedMatch;

/// First crisis scenario whose conditions are all in `active_conditions`.
///
/// The caller decides which condition labels are currently active; nothing is
/// remembered between calls.
pub fn check_combined(rules: &RuleSet, active_conditions: &HashSet<String>) -> Option<CombinedMatch> {
    rules
        .combined
        .iter()
        .find(|t| t.conditions.iter().all(|c| active_conditions.contains(c)))
        .map(|t| CombinedMatch {
            scenario: t.scenario.clone(),
            action: t.action.clone(),
            priority: "critical",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(labels: &[&str]) -> HashSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_perfect_storm() {
        let rules = RuleSet::lab_defaults().unwrap();
        let m = check_combined(
            &rules,
            &active(&["multiple instruments down", "short staffed", "high volume"]),
        )
        .unwrap();
        assert_eq!(m.scenario, "perfect_storm");
        assert_eq!(m.priority, "critical");
        assert!(!m.action.is_empty());

        assert_eq!(check_combined(&rules, &active(&["multiple instruments down", "short staffed"])), None);
    }

    #[test]
    fn test_superset_and_order() {
        let rules = RuleSet::lab_defaults().unwrap();
        // Satisfies perfect_storm and supply_crisis; declared order picks the first
        let m = check_combined(
            &rules,
            &active(&["reagent shortage", "high volume", "short staffed", "multiple instruments down", "noise"]),
        )
        .unwrap();
        assert_eq!(m.scenario, "perfect_storm");

        let m = check_combined(&rules, &active(&["reagent shortage", "high volume"])).unwrap();
        assert_eq!(m.scenario, "supply_crisis");
    }

    #[test]
    fn test_empty_conditions() {
        let rules = RuleSet::lab_defaults().unwrap();
        assert_eq!(check_combined(&rules, &HashSet::new()), None);
    }
}
