use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::AlertError;
use crate::rules::RuleSet;
use crate::types::{
    ActionLink, Category, Config, Fact, Metrics, Priority, StructuredMessage, TeamsPayload,
};

const DEFAULT_COLOR: &str = "808080";
const MAX_METRIC_FACTS: usize = 3;

/// Most delivery attempts a notifier will make for one message.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 10;
/// Longest wait between two delivery attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Wait after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`,
/// never more than [`MAX_BACKOFF`].
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}

/// Builds transport-neutral notifications from routing decisions.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    source: String,
    dashboard_base_url: String,
    lab_name: Option<String>,
}

impl MessageFormatter {
    pub fn new(source: impl Into<String>, dashboard_base_url: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dashboard_base_url: dashboard_base_url.into().trim_end_matches('/').to_string(),
            lab_name: None,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            lab_name: cfg.lab_name.clone(),
            ..Self::new(cfg.alert_source.clone(), cfg.dashboard_base_url.clone())
        }
    }

    pub fn format(
        &self,
        rules: &RuleSet,
        title: &str,
        body: &str,
        category: Category,
        priority: Priority,
        metrics: Option<&Metrics>,
    ) -> StructuredMessage {
        self.format_at(rules, title, body, category, priority, metrics, Utc::now())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn format_at(
        &self,
        rules: &RuleSet,
        title: &str,
        body: &str,
        category: Category,
        priority: Priority,
        metrics: Option<&Metrics>,
        at: DateTime<Utc>,
    ) -> StructuredMessage {
        let color = rules
            .category(category)
            .map(|c| c.color.clone())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string());

        let title = match &self.lab_name {
            Some(lab) => format!("{} - {}", lab, title),
            None => title.to_string(),
        };

        let mut facts = vec![
            Fact::new("Priority", priority.as_str().to_uppercase()),
            Fact::new("Category", category.as_str()),
            Fact::new("Timestamp", at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
            Fact::new("Source", self.source.clone()),
        ];
        if let Some(m) = metrics {
            for (name, value) in m.iter().take(MAX_METRIC_FACTS) {
                facts.push(Fact::new(name.clone(), value.to_string()));
            }
        }

        let mut actions = Vec::new();
        if category.has_action_links() {
            let dashboards = rules.dashboards_for(category);
            if dashboards.is_empty() {
                actions.push(ActionLink {
                    name: format!("Open {} dashboard", category),
                    url: format!("{}/{}", self.dashboard_base_url, category),
                });
            }
            for d in dashboards {
                actions.push(ActionLink {
                    name: format!("Open {}", d.replace('_', " ")),
                    url: format!("{}/{}", self.dashboard_base_url, d),
                });
            }
        }

        StructuredMessage {
            title,
            body: body.to_string(),
            color,
            icon: priority.icon(),
            priority,
            facts,
            actions,
        }
    }
}

/// Render a message as a Teams `MessageCard`.
pub fn build_teams_payload(msg: &StructuredMessage) -> TeamsPayload {
    let facts: Vec<serde_json::Value> = msg
        .facts
        .iter()
        .map(|f| serde_json::json!({"name": f.name, "value": f.value}))
        .collect();

    let sections = vec![serde_json::json!({
        "activityTitle": format!("{} {}", msg.icon, msg.title),
        "activityText": msg.body,
        "facts": facts,
        "markdown": true
    })];

    let potential_action = msg
        .actions
        .iter()
        .map(|a| {
            serde_json::json!({
                "@type": "OpenUri",
                "name": a.name,
                "targets": [{"os": "default", "uri": a.url}]
            })
        })
        .collect();

    TeamsPayload {
        card_type: "MessageCard",
        context: "https://schema.org/extensions",
        theme_color: msg.color.clone(),
        summary: msg.title.clone(),
        sections,
        potential_action,
    }
}

/// Destination for formatted alerts. Failures are reported as `false` and
/// never raised to the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &StructuredMessage) -> bool;

    fn name(&self) -> &str;
}

/// Posts `MessageCard`s to a Teams incoming webhook with bounded retry.
pub struct TeamsNotifier {
    webhook_url: String,
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
}

impl TeamsNotifier {
    pub fn new(
        webhook_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Result<Self, AlertError> {
        let webhook_url = webhook_url.into();
        if webhook_url.trim().is_empty() {
            return Err(AlertError::Config("Teams webhook URL cannot be empty".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AlertError::Config(format!("build HTTP client: {}", e)))?;
        Ok(Self {
            webhook_url,
            client,
            max_attempts: max_attempts.clamp(1, MAX_DELIVERY_ATTEMPTS),
            base_delay,
        })
    }

    pub fn from_config(cfg: &Config, webhook_url: &str) -> Result<Self, AlertError> {
        Self::new(
            webhook_url,
            Duration::from_secs(cfg.request_timeout_secs),
            cfg.max_delivery_attempts,
            Duration::from_millis(cfg.retry_base_delay_ms),
        )
    }

    /// Send with retry. Waits `base`, `2*base`, ... between attempts, see [`backoff_delay`].
    pub async fn deliver(&self, payload: &TeamsPayload) -> Result<(), AlertError> {
        let mut last_err = AlertError::Delivery("no attempt made".to_string());
        for attempt in 1..=self.max_attempts {
            match send_to_teams(&self.client, &self.webhook_url, payload).await {
                Ok(()) => {
                    debug!(attempt, "Teams webhook accepted message");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "Teams delivery attempt failed");
                    last_err = e;
                }
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(backoff_delay(self.base_delay, attempt)).await;
            }
        }
        Err(last_err)
    }
}

#[async_trait]
impl NotificationSink for TeamsNotifier {
    async fn send(&self, message: &StructuredMessage) -> bool {
        let payload = build_teams_payload(message);
        match self.deliver(&payload).await {
            Ok(()) => true,
            Err(e) => {
                error!(title = %message.title, priority = %message.priority, error = %e, "Dropping alert after retries");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "teams"
    }
}

pub async fn send_to_teams(
    client: &reqwest::Client,
    webhook_url: &str,
    payload: &TeamsPayload,
) -> Result<(), AlertError> {
    let res = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .map_err(|e| AlertError::Delivery(format!("Teams request failed: {}", e)))?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(AlertError::Delivery(format!("Teams webhook returned {} - {}", status, body)));
    }
    Ok(())
}

/// Logs messages instead of sending them. Used for dry runs.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, message: &StructuredMessage) -> bool {
        let facts: Vec<String> = message.facts.iter().map(|f| format!("{}={}", f.name, f.value)).collect();
        info!(
            title = %message.title,
            priority = %message.priority,
            facts = %facts.join(", "),
            "[dry-run] {}",
            message.body
        );
        true
    }

    fn name(&self) -> &str {
        "log"
    }
}
