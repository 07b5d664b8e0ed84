use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use crate::teams::{backoff_delay, MAX_DELIVERY_ATTEMPTS};
use crate::types::Config;

/// Source of environment variables, swappable in tests.
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

fn is_truthy(v: &str) -> bool {
    matches!(v, "1" | "true" | "TRUE" | "True")
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let teams_webhook_url = env
        .get_var("TEAMS_WEBHOOK_URL")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let dry_run = env.get_var("DRY_RUN").map(|v| is_truthy(&v)).unwrap_or(false);

    let request_timeout_secs: u64 = env.get_var("REQUEST_TIMEOUT_SECS")
        .unwrap_or_else(|| "10".to_string())
        .parse()
        .context("Invalid REQUEST_TIMEOUT_SECS")?;

    let max_delivery_attempts: u32 = env.get_var("MAX_DELIVERY_ATTEMPTS")
        .unwrap_or_else(|| "3".to_string())
        .parse()
        .context("Invalid MAX_DELIVERY_ATTEMPTS")?;
    if !(1..=MAX_DELIVERY_ATTEMPTS).contains(&max_delivery_attempts) {
        return Err(anyhow!("MAX_DELIVERY_ATTEMPTS must be between 1 and {}", MAX_DELIVERY_ATTEMPTS));
    }

    let retry_base_delay_ms: u64 = env.get_var("RETRY_BASE_DELAY_MS")
        .unwrap_or_else(|| "1000".to_string())
        .parse()
        .context("Invalid RETRY_BASE_DELAY_MS")?;

    let dispatch_interval_secs: u64 = env.get_var("DISPATCH_INTERVAL_SECS")
        .unwrap_or_else(|| "30".to_string())
        .parse()
        .context("Invalid DISPATCH_INTERVAL_SECS")?;
    // A slower ticker can step over an HH:MM slot entirely.
    if !(1..=60).contains(&dispatch_interval_secs) {
        return Err(anyhow!("DISPATCH_INTERVAL_SECS must be between 1 and 60"));
    }

    let alert_source = env.get_var("ALERT_SOURCE")
        .unwrap_or_else(|| "Lab Alert Router".to_string());
    let dashboard_base_url = env.get_var("DASHBOARD_BASE_URL")
        .unwrap_or_else(|| "https://dashboards.lab.local".to_string());
    let lab_name = env.get_var("LAB_NAME");

    Ok(Config {
        teams_webhook_url,
        dry_run,
        request_timeout_secs,
        max_delivery_attempts,
        retry_base_delay_ms,
        dispatch_interval_secs,
        alert_source,
        dashboard_base_url,
        lab_name,
    })
}

impl Config {
    /// Whether alerts are logged rather than posted.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.teams_webhook_url.is_none()
    }

    /// Longest one message can spend in a sink: every attempt timing out
    /// plus the waits between them.
    pub fn delivery_budget(&self) -> Duration {
        let timeout = Duration::from_secs(self.request_timeout_secs);
        let base = Duration::from_millis(self.retry_base_delay_ms);
        (1..self.max_delivery_attempts).fold(timeout, |total, attempt| {
            total.saturating_add(backoff_delay(base, attempt)).saturating_add(timeout)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_loading_with_env() {
        let env = MockEnvironment::new()
            .with_var("TEAMS_WEBHOOK_URL", "https://outlook.office.com/webhook/test")
            .with_var("DRY_RUN", "false")
            .with_var("REQUEST_TIMEOUT_SECS", "5")
            .with_var("MAX_DELIVERY_ATTEMPTS", "4")
            .with_var("RETRY_BASE_DELAY_MS", "250")
            .with_var("DISPATCH_INTERVAL_SECS", "60")
            .with_var("ALERT_SOURCE", "Core Lab")
            .with_var("DASHBOARD_BASE_URL", "https://bi.example.org")
            .with_var("LAB_NAME", "Main Campus");

        let config = load_config_with_env(&env).unwrap();

        assert_eq!(config.teams_webhook_url.as_deref(), Some("https://outlook.office.com/webhook/test"));
        assert!(!config.dry_run);
        assert!(!config.is_dry_run());
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.max_delivery_attempts, 4);
        assert_eq!(config.retry_base_delay_ms, 250);
        assert_eq!(config.dispatch_interval_secs, 60);
        assert_eq!(config.alert_source, "Core Lab");
        assert_eq!(config.dashboard_base_url, "https://bi.example.org");
        assert_eq!(config.lab_name, Some("Main Campus".to_string()));
    }

    #[test]
    fn test_config_loading_defaults() {
        let config = load_config_with_env(&MockEnvironment::new()).unwrap();

        assert_eq!(config.teams_webhook_url, None);
        assert!(config.is_dry_run()); // no webhook
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.max_delivery_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.dispatch_interval_secs, 30);
        assert_eq!(config.alert_source, "Lab Alert Router");
        assert_eq!(config.lab_name, None);
    }

    #[test]
    fn test_blank_webhook_is_absent() {
        let env = MockEnvironment::new().with_var("TEAMS_WEBHOOK_URL", "   ");
        let config = load_config_with_env(&env).unwrap();
        assert_eq!(config.teams_webhook_url, None);
    }

    #[test]
    fn test_dry_run_parsing() {
        for val in ["1", "true", "TRUE", "True"] {
            let env = MockEnvironment::new()
                .with_var("TEAMS_WEBHOOK_URL", "https://test.com")
                .with_var("DRY_RUN", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(config.is_dry_run(), "Failed for value: {}", val);
        }

        for val in ["0", "false", "no", "off", ""] {
            let env = MockEnvironment::new()
                .with_var("TEAMS_WEBHOOK_URL", "https://test.com")
                .with_var("DRY_RUN", val);
            let config = load_config_with_env(&env).unwrap();
            assert!(!config.is_dry_run(), "Failed for value: {}", val);
        }
    }

    #[test]
    fn test_invalid_numeric_values() {
        let env = MockEnvironment::new().with_var("REQUEST_TIMEOUT_SECS", "soon");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));

        let env = MockEnvironment::new().with_var("MAX_DELIVERY_ATTEMPTS", "0");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("MAX_DELIVERY_ATTEMPTS"));

        let env = MockEnvironment::new().with_var("RETRY_BASE_DELAY_MS", "fast");
        let err = load_config_with_env(&env).unwrap_err();
        assert!(err.to_string().contains("RETRY_BASE_DELAY_MS"));

        let env = MockEnvironment::new().with_var("RETRY_BASE_DELAY_MS", "-5");
        assert!(load_config_with_env(&env).is_err());
    }

    #[test]
    fn test_delivery_attempts_upper_bound() {
        let env = MockEnvironment::new().with_var("MAX_DELIVERY_ATTEMPTS", "10");
        assert_eq!(load_config_with_env(&env).unwrap().max_delivery_attempts, 10);

        for val in ["11", "4294967295"] {
            let env = MockEnvironment::new().with_var("MAX_DELIVERY_ATTEMPTS", val);
            let err = load_config_with_env(&env).unwrap_err();
            assert!(err.to_string().contains("between 1 and 10"), "value: {}", val);
        }
    }

    #[test]
    fn test_delivery_budget() {
        // 3 x 10 s timeouts plus 1 s and 2 s of backoff
        let cfg = load_config_with_env(&MockEnvironment::new()).unwrap();
        assert_eq!(cfg.delivery_budget(), Duration::from_secs(33));

        let env = MockEnvironment::new()
            .with_var("MAX_DELIVERY_ATTEMPTS", "1")
            .with_var("REQUEST_TIMEOUT_SECS", "5");
        assert_eq!(load_config_with_env(&env).unwrap().delivery_budget(), Duration::from_secs(5));
    }

    #[test]
    fn test_dispatch_interval_bounds() {
        for val in ["0", "61", "300"] {
            let env = MockEnvironment::new().with_var("DISPATCH_INTERVAL_SECS", val);
            let err = load_config_with_env(&env).unwrap_err();
            assert!(err.to_string().contains("DISPATCH_INTERVAL_SECS"), "value: {}", val);
        }
        let env = MockEnvironment::new().with_var("DISPATCH_INTERVAL_SECS", "1");
        assert_eq!(load_config_with_env(&env).unwrap().dispatch_interval_secs, 1);
    }
}
