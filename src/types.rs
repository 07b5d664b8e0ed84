use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AlertError;

#[derive(Debug, Clone)]
pub struct Config {
    pub teams_webhook_url: Option<String>,
    pub dry_run: bool,
    pub request_timeout_secs: u64,
    pub max_delivery_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub dispatch_interval_secs: u64,
    pub alert_source: String,
    pub dashboard_base_url: String,
    pub lab_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Priority::High => "🔴",
            Priority::Medium => "🟡",
            Priority::Low => "🟢",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert category. `Escalation` and `Trend` are produced by the phrase
/// buckets and have no keyword table of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Critical,
    Equipment,
    Quality,
    Performance,
    Staffing,
    Supply,
    Incident,
    Regulatory,
    Patient,
    Operations,
    Escalation,
    Trend,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Critical => "critical",
            Category::Equipment => "equipment",
            Category::Quality => "quality",
            Category::Performance => "performance",
            Category::Staffing => "staffing",
            Category::Supply => "supply",
            Category::Incident => "incident",
            Category::Regulatory => "regulatory",
            Category::Patient => "patient",
            Category::Operations => "operations",
            Category::Escalation => "escalation",
            Category::Trend => "trend",
        }
    }

    /// Categories whose notifications carry dashboard links.
    pub fn has_action_links(&self) -> bool {
        matches!(self, Category::Incident | Category::Critical | Category::Performance)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = match s.trim().to_lowercase().as_str() {
            "critical" => Category::Critical,
            "equipment" => Category::Equipment,
            "quality" => Category::Quality,
            "performance" => Category::Performance,
            "staffing" => Category::Staffing,
            "supply" => Category::Supply,
            "incident" => Category::Incident,
            "regulatory" => Category::Regulatory,
            "patient" => Category::Patient,
            "operations" => Category::Operations,
            "escalation" => Category::Escalation,
            "trend" => Category::Trend,
            other => return Err(AlertError::Config(format!("unknown category '{}'", other))),
        };
        Ok(c)
    }
}

/// A single reported metric. Most are numeric; some callers attach labels
/// such as `"test_type": "routine"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(v) => write!(f, "{}", v),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Number(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Number(v as f64)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

pub type Metrics = BTreeMap<String, MetricValue>;

/// Outcome of evaluating one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertDecision {
    pub should_forward: bool,
    pub priority: Option<Priority>,
    pub category: Option<Category>,
}

impl AlertDecision {
    pub fn forward(priority: Priority, category: Category) -> Self {
        Self {
            should_forward: true,
            priority: Some(priority),
            category: Some(category),
        }
    }

    pub fn none() -> Self {
        Self {
            should_forward: false,
            priority: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    ImmediateSupervisor,
    ManagerNotification,
    DirectorEscalation,
    MedicalDirector,
}

impl EscalationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationTier::ImmediateSupervisor => "immediate_supervisor",
            EscalationTier::ManagerNotification => "manager_notification",
            EscalationTier::DirectorEscalation => "director_escalation",
            EscalationTier::MedicalDirector => "medical_director",
        }
    }
}

impl fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crisis scenario whose required conditions are all active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedMatch {
    pub scenario: String,
    pub action: String,
    pub priority: &'static str,
}

/// An operations alert produced by the scheduled dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedAlert {
    pub trigger: String,
    pub slot: String,
    pub priority: Priority,
    pub category: Category,
    pub dashboards: Vec<String>,
}

impl DispatchedAlert {
    pub fn title(&self) -> String {
        format!("Scheduled update: {}", self.trigger.replace('_', " "))
    }

    pub fn body(&self) -> String {
        format!("Dashboards due at {}: {}", self.slot, self.dashboards.join(", "))
    }
}

/// Evaluation result enriched with escalation and dashboard routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedAlert {
    pub decision: AlertDecision,
    pub escalation: Option<EscalationTier>,
    pub dashboards: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub name: String,
    pub value: String,
}

impl Fact {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLink {
    pub name: String,
    pub url: String,
}

/// Transport-neutral notification produced by the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredMessage {
    pub title: String,
    pub body: String,
    pub color: String,
    pub icon: &'static str,
    pub priority: Priority,
    pub facts: Vec<Fact>,
    pub actions: Vec<ActionLink>,
}

#[derive(Serialize)]
pub struct TeamsPayload {
    #[serde(rename = "@type")]
    pub card_type: &'static str,
    #[serde(rename = "@context")]
    pub context: &'static str,
    #[serde(rename = "themeColor")]
    pub theme_color: String,
    pub summary: String,
    pub sections: Vec<serde_json::Value>,
    #[serde(rename = "potentialAction", skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<serde_json::Value>,
}

/// One line of the newline-delimited JSON event feed.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEvent {
    pub message: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl IncomingEvent {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Lab alert")
    }
}
