use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    /// Malformed rule table or environment value. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The notification sink could not accept a message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The dispatcher ran less often than once a minute and may have
    /// skipped a scheduled slot.
    #[error("dispatcher ticks {gap_secs}s apart, scheduled slots may be missed")]
    SchedulingDrift { gap_secs: i64 },
}

pub type AlertResult<T> = std::result::Result<T, AlertError>;
