//! Error types for the trip planner.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Validation failure for a single conversation step.
///
/// The display text names the offending field category and is shown to the
/// user as-is, so it never contains raw parser internals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("Нужно ровно 4 поля через запятую, получено {found}")]
    FieldCountMismatch { found: usize },

    #[error("Не указан город ({field})")]
    MissingCity { field: &'static str },

    #[error("Неверный диапазон дат: {reason}")]
    InvalidDateRange { reason: String },

    #[error("Количество гостей должно быть положительным целым числом, получено «{value}»")]
    InvalidGuestCount { value: String },

    #[error("Количество гостей должно быть не больше {max}, получено «{value}»")]
    GuestCountOutOfRange { value: String, max: u32 },
}

/// Why a provider search produced no payload.
///
/// Stored verbatim in the session, so it is serializable and cloneable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProviderFailure {
    #[error("превышено время ожидания ({0} с)")]
    Timeout(u64),

    #[error("ошибка соединения: {0}")]
    Transport(String),

    #[error("некорректный ответ: {0}")]
    MalformedResponse(String),

    #[error("поставщик не подключён")]
    NotConfigured,

    #[error("запрос не поддерживается: {0}")]
    UnsupportedQuery(String),
}

impl ProviderFailure {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(after.as_secs())
    }
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else if e.is_timeout() {
            Self::Transport(format!("request timed out: {e}"))
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result type alias for the planner.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failure_names_field_category() {
        let err = ParseFailure::InvalidGuestCount {
            value: "two".into(),
        };
        assert!(err.to_string().contains("гостей"));
        assert!(err.to_string().contains("two"));

        let err = ParseFailure::FieldCountMismatch { found: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn provider_failure_serde_roundtrip() {
        let failures = [
            ProviderFailure::Timeout(15),
            ProviderFailure::Transport("refused".into()),
            ProviderFailure::NotConfigured,
        ];
        for failure in failures {
            let json = serde_json::to_string(&failure).unwrap();
            let parsed: ProviderFailure = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, failure);
        }
    }

    #[test]
    fn timeout_uses_whole_seconds() {
        let f = ProviderFailure::timeout(Duration::from_millis(15_400));
        assert_eq!(f, ProviderFailure::Timeout(15));
    }
}
