//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Runtime configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Telegram bot token. When unset the bot runs on the CLI channel.
    pub telegram_token: Option<SecretString>,
    /// Telegram usernames or numeric IDs allowed to talk to the bot (`*` = everyone).
    pub telegram_allowed_users: Vec<String>,
    /// Travelpayouts token for the Aviasales flight search.
    pub aviasales_token: Option<SecretString>,
    /// Yandex Rasp API key for the rail schedule search.
    pub yandex_rasp_key: Option<SecretString>,
    /// Upper bound for a single provider search.
    pub provider_timeout: Duration,
    /// Sessions untouched for this long are evicted.
    pub session_idle_timeout: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
    /// Maximum rows a provider returns for the summary.
    pub result_limit: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_allowed_users: vec!["*".to_string()],
            aviasales_token: None,
            yandex_rasp_key: None,
            provider_timeout: Duration::from_secs(15),
            session_idle_timeout: Duration::from_secs(3600), // 1 hour
            sweep_interval: Duration::from_secs(60),
            result_limit: 5,
        }
    }
}

impl PlannerConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secret = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };

        let telegram_allowed_users = match lookup("TELEGRAM_ALLOWED_USERS") {
            Some(raw) => split_list(&raw),
            None => defaults.telegram_allowed_users,
        };

        Ok(Self {
            telegram_token: secret("TELEGRAM_BOT_TOKEN"),
            telegram_allowed_users,
            aviasales_token: secret("AVIASALES_TOKEN"),
            yandex_rasp_key: secret("YANDEX_RASP_API_KEY"),
            provider_timeout: secs(
                &lookup,
                "TRIP_PLANNER_PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout,
            )?,
            session_idle_timeout: secs(
                &lookup,
                "TRIP_PLANNER_SESSION_IDLE_SECS",
                defaults.session_idle_timeout,
            )?,
            sweep_interval: secs(
                &lookup,
                "TRIP_PLANNER_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval,
            )?,
            result_limit: number(&lookup, "TRIP_PLANNER_RESULT_LIMIT", defaults.result_limit)?,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn number<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?} is not a number: {e}"),
        }),
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let n = number(lookup, key, default.as_secs() as usize)?;
    Ok(Duration::from_secs(n as u64))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PlannerConfig::from_lookup(|_| None).unwrap();
        assert!(config.telegram_token.is_none());
        assert_eq!(config.telegram_allowed_users, vec!["*"]);
        assert_eq!(config.provider_timeout, Duration::from_secs(15));
        assert_eq!(config.session_idle_timeout, Duration::from_secs(3600));
        assert_eq!(config.result_limit, 5);
    }

    #[test]
    fn reads_tokens_and_numbers() {
        let config = PlannerConfig::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:ABC"),
            ("TELEGRAM_ALLOWED_USERS", "alice, 42 ,,"),
            ("AVIASALES_TOKEN", "avia"),
            ("TRIP_PLANNER_PROVIDER_TIMEOUT_SECS", "3"),
            ("TRIP_PLANNER_RESULT_LIMIT", "10"),
        ]))
        .unwrap();

        assert_eq!(config.telegram_token.unwrap().expose_secret(), "123:ABC");
        assert_eq!(config.telegram_allowed_users, vec!["alice", "42"]);
        assert_eq!(config.aviasales_token.unwrap().expose_secret(), "avia");
        assert!(config.yandex_rasp_key.is_none());
        assert_eq!(config.provider_timeout, Duration::from_secs(3));
        assert_eq!(config.result_limit, 10);
    }

    #[test]
    fn blank_token_is_treated_as_unset() {
        let config =
            PlannerConfig::from_lookup(lookup_from(&[("TELEGRAM_BOT_TOKEN", "   ")])).unwrap();
        assert!(config.telegram_token.is_none());
    }

    #[test]
    fn malformed_number_is_rejected() {
        let err = PlannerConfig::from_lookup(lookup_from(&[(
            "TRIP_PLANNER_PROVIDER_TIMEOUT_SECS",
            "soon",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("TRIP_PLANNER_PROVIDER_TIMEOUT_SECS"));
    }

    #[test]
    fn zero_is_rejected() {
        let err =
            PlannerConfig::from_lookup(lookup_from(&[("TRIP_PLANNER_RESULT_LIMIT", "0")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
