// Static routing tables
pub mod categories;
pub mod schedules;
pub mod triggers;

pub use categories::AlertCategory;
pub use schedules::{weekday_name, ScheduleSpec, ScheduledTrigger};
pub use triggers::{CombinedTrigger, EscalationRule, TriggerPatterns};

use std::collections::HashSet;

use crate::error::{AlertError, AlertResult};
use crate::types::Category;

/// Every table the engine consults. Built once at startup and shared
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub categories: Vec<AlertCategory>,
    pub triggers: TriggerPatterns,
    pub escalation: Vec<EscalationRule>,
    pub combined: Vec<CombinedTrigger>,
    pub schedules: Vec<ScheduledTrigger>,
    pub dashboards: Vec<(Category, Vec<String>)>,
}

impl RuleSet {
    /// The laboratory's default tables. Fails on any malformed entry.
    pub fn lab_defaults() -> AlertResult<Self> {
        let rules = Self {
            categories: categories::lab_categories()?,
            triggers: triggers::lab_trigger_patterns(),
            escalation: triggers::lab_escalation_rules(),
            combined: triggers::lab_combined_triggers(),
            schedules: schedules::lab_schedules()?,
            dashboards: lab_dashboard_routes(),
        };
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> AlertResult<()> {
        let mut seen = HashSet::new();
        for c in &self.categories {
            if !seen.insert(c.category) {
                return Err(AlertError::Config(format!("category '{}' defined twice", c.category)));
            }
            if c.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(AlertError::Config(format!("category '{}' has an empty keyword", c.category)));
            }
        }
        for t in &self.combined {
            if t.conditions.is_empty() {
                return Err(AlertError::Config(format!("combined trigger '{}' has no conditions", t.scenario)));
            }
        }
        Ok(())
    }

    pub fn category(&self, category: Category) -> Option<&AlertCategory> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Dashboard identifiers an alert of `category` is routed to.
    pub fn dashboards_for(&self, category: Category) -> &[String] {
        self.dashboards
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, d)| d.as_slice())
            .unwrap_or(&[])
    }
}

fn lab_dashboard_routes() -> Vec<(Category, Vec<String>)> {
    let route = |c: Category, ids: &[&str]| -> (Category, Vec<String>) { (c, ids.iter().map(|s| s.to_string()).collect()) };
    vec![
        route(Category::Critical, &["executive_overview", "daily_operations"]),
        route(Category::Escalation, &["executive_overview"]),
        route(Category::Equipment, &["equipment_status"]),
        route(Category::Quality, &["qc_dashboard", "quality_metrics"]),
        route(Category::Performance, &["tat_performance"]),
        route(Category::Staffing, &["staffing_board"]),
        route(Category::Supply, &["inventory"]),
        route(Category::Incident, &["incident_log", "executive_overview"]),
        route(Category::Regulatory, &["regulatory_tracker"]),
        route(Category::Patient, &["patient_safety"]),
        route(Category::Operations, &["daily_operations"]),
        route(Category::Trend, &["weekly_trends"]),
    ]
}
