use crate::error::AlertResult;
use crate::parsing::{parse_threshold, Threshold};
use crate::types::{Category, Priority};

/// A keyword bucket with its priority, display color and metric thresholds.
#[derive(Debug, Clone)]
pub struct AlertCategory {
    pub category: Category,
    pub keywords: Vec<String>,
    pub priority: Priority,
    pub color: String,
    pub thresholds: Vec<(String, Threshold)>,
}

impl AlertCategory {
    pub fn new(
        category: Category,
        priority: Priority,
        color: &str,
        keywords: &[&str],
        thresholds: &[(&str, &str)],
    ) -> AlertResult<Self> {
        let thresholds = thresholds
            .iter()
            .map(|(name, expr)| Ok((name.to_string(), parse_threshold(expr)?)))
            .collect::<AlertResult<Vec<_>>>()?;
        Ok(Self {
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            priority,
            color: color.to_string(),
            thresholds,
        })
    }
}

// Definition order is match order.
pub(crate) fn lab_categories() -> AlertResult<Vec<AlertCategory>> {
    Ok(vec![
        AlertCategory::new(
            Category::Critical,
            Priority::High,
            "D13438",
            &["critical", "emergency", "stat delay", "outage", "code red"],
            &[("critical_values_pending", "> 0"), ("downtime_minutes", "> 30")],
        )?,
        AlertCategory::new(
            Category::Equipment,
            Priority::High,
            "FF8C00",
            &["analyzer error", "instrument fault", "maintenance overdue", "calibration failed", "offline"],
            &[("error_count", "> 3"), ("downtime_minutes", "> 15")],
        )?,
        AlertCategory::new(
            Category::Quality,
            Priority::High,
            "8764B8",
            &["qc failure", "qc out of range", "westgard", "proficiency", "contamination"],
            &[("qc_cv", "> 5"), ("qc_violations", "> 0")],
        )?,
        AlertCategory::new(
            Category::Performance,
            Priority::Medium,
            "FFB900",
            &["TAT", "turnaround", "backlog", "delay", "throughput"],
            &[("TAT", "> 30"), ("backlog_count", "> 50"), ("throughput_per_hour", "< 50")],
        )?,
        AlertCategory::new(
            Category::Staffing,
            Priority::Medium,
            "0078D4",
            &["short staffed", "understaffed", "call out", "sick call", "overtime"],
            &[("staff_available", "< 3"), ("overtime_hours", "> 8")],
        )?,
        AlertCategory::new(
            Category::Supply,
            Priority::Low,
            "00B294",
            &["low stock", "reagent low", "out of stock", "backorder", "expiring"],
            &[("reagent_days_remaining", "< 3"), ("stock_level", "< 10")],
        )?,
        AlertCategory::new(
            Category::Incident,
            Priority::High,
            "A4262C",
            &["incident", "spill", "injury", "needle stick", "exposure"],
            &[("severity", "any")],
        )?,
        AlertCategory::new(
            Category::Regulatory,
            Priority::High,
            "5C2D91",
            &["cap inspection", "clia", "audit finding", "compliance", "accreditation"],
            &[("findings", "> 0")],
        )?,
        AlertCategory::new(
            Category::Patient,
            Priority::High,
            "E81123",
            &["patient complaint", "mislabeled", "wrong patient", "patient identification"],
            &[("affected_patients", "> 0")],
        )?,
        AlertCategory::new(
            Category::Operations,
            Priority::Low,
            "107C10",
            &["shift report", "daily summary", "sample volume"],
            &[("sample_volume", "> 1500")],
        )?,
    ])
}
