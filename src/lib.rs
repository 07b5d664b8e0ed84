// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod rules;
pub mod engine;
pub mod teams;
pub mod scheduler;
pub mod router;
pub mod report;
pub mod service;

// Re-export commonly used items
pub use types::*;
pub use error::{AlertError, AlertResult};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_threshold, matches, any_violates, Threshold};
pub use rules::RuleSet;
pub use engine::{evaluate, resolve_escalation, check_combined};
pub use teams::{backoff_delay, build_teams_payload, send_to_teams, LogSink, MessageFormatter, NotificationSink, TeamsNotifier};
pub use scheduler::{spawn_dispatcher, ScheduledDispatcher};
pub use router::{AlertRouter, ForwardOutcome};
pub use report::{RoutingReport, ReportSummary};
pub use service::{deliver_events, deliver_scheduled, parse_event, run_service};
