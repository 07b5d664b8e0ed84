use chrono::{NaiveTime, Weekday};

use crate::error::{AlertError, AlertResult};

/// When a scheduled trigger fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSpec {
    /// Every day at each `HH:MM`.
    Times(Vec<String>),
    /// Once a week, `"<Weekday> HH:MM"`.
    Weekly(String),
}

#[derive(Debug, Clone)]
pub struct ScheduledTrigger {
    pub name: String,
    pub schedule: ScheduleSpec,
    pub dashboards: Vec<String>,
}

impl ScheduledTrigger {
    pub fn daily(name: &str, times: &[&str], dashboards: &[&str]) -> AlertResult<Self> {
        for t in times {
            validate_hhmm(t)?;
        }
        Ok(Self {
            name: name.to_string(),
            schedule: ScheduleSpec::Times(times.iter().map(|t| t.to_string()).collect()),
            dashboards: dashboards.iter().map(|d| d.to_string()).collect(),
        })
    }

    pub fn weekly(name: &str, day_time: &str, dashboards: &[&str]) -> AlertResult<Self> {
        let (day, time) = day_time
            .trim()
            .split_once(' ')
            .ok_or_else(|| AlertError::Config(format!("weekly slot '{}' must be '<Weekday> HH:MM'", day_time)))?;
        let weekday: Weekday = day
            .parse()
            .map_err(|_| AlertError::Config(format!("weekly slot '{}' has unknown weekday", day_time)))?;
        validate_hhmm(time)?;
        Ok(Self {
            name: name.to_string(),
            // Normalized to the same form the dispatcher renders for `now`.
            schedule: ScheduleSpec::Weekly(format!("{} {}", weekday_name(weekday), time)),
            dashboards: dashboards.iter().map(|d| d.to_string()).collect(),
        })
    }
}

fn validate_hhmm(t: &str) -> AlertResult<()> {
    if t.len() != 5 || NaiveTime::parse_from_str(t, "%H:%M").is_err() {
        return Err(AlertError::Config(format!("schedule time '{}' must be HH:MM", t)));
    }
    Ok(())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub(crate) fn lab_schedules() -> AlertResult<Vec<ScheduledTrigger>> {
    Ok(vec![
        ScheduledTrigger::daily(
            "shift_reports",
            &["06:45", "14:45", "22:45"],
            &["shift_summary", "staffing_board", "tat_performance"],
        )?,
        ScheduledTrigger::daily("daily_summary", &["07:00"], &["daily_operations", "quality_metrics"])?,
        ScheduledTrigger::daily("qc_review", &["08:00", "20:00"], &["qc_dashboard"])?,
        ScheduledTrigger::weekly(
            "weekly_review",
            "Monday 09:00",
            &["weekly_trends", "inventory", "regulatory_tracker"],
        )?,
    ])
}
