use crate::error::{AlertError, AlertResult};
use crate::types::{MetricValue, Metrics};

/// Numeric trigger condition attached to a category metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    GreaterThan(f64),
    LessThan(f64),
    Any,
}

impl Threshold {
    /// Whether `value` trips this threshold. Text values only trip `Any`.
    pub fn is_violated_by(&self, value: &MetricValue) -> bool {
        match self {
            Threshold::Any => true,
            Threshold::GreaterThan(limit) => value.as_f64().map(|v| v > *limit).unwrap_or(false),
            Threshold::LessThan(limit) => value.as_f64().map(|v| v < *limit).unwrap_or(false),
        }
    }
}

pub fn parse_threshold(expr: &str) -> AlertResult<Threshold> {
    let expr = expr.trim();
    if expr.eq_ignore_ascii_case("any") {
        return Ok(Threshold::Any);
    }
    let (greater, rest) = if let Some(rest) = expr.strip_prefix('>') {
        (true, rest)
    } else if let Some(rest) = expr.strip_prefix('<') {
        (false, rest)
    } else {
        return Err(AlertError::Config(format!(
            "threshold '{}' must start with '>' or '<' or be 'any'",
            expr
        )));
    };
    let limit: f64 = rest
        .trim()
        .parse()
        .map_err(|_| AlertError::Config(format!("threshold '{}' has no numeric limit", expr)))?;
    if !limit.is_finite() {
        return Err(AlertError::Config(format!("threshold '{}' is not finite", expr)));
    }
    if greater {
        Ok(Threshold::GreaterThan(limit))
    } else {
        Ok(Threshold::LessThan(limit))
    }
}

/// Case-insensitive substring match used by every phrase and keyword table.
///
/// Deliberately naive: `"TAT"` also matches inside `"STATus"`. Call sites go
/// through this function so a token-boundary matcher can replace it.
pub fn matches(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.to_lowercase().contains(&phrase.to_lowercase())
}

/// True when any named metric is present in `metrics` and trips its threshold.
/// Missing metric names never count as violations.
pub fn any_violates(thresholds: &[(String, Threshold)], metrics: &Metrics) -> bool {
    thresholds.iter().any(|(name, threshold)| {
        metrics
            .get(name)
            .map(|value| threshold.is_violated_by(value))
            .unwrap_or(false)
    })
}
