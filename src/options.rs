use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds. Bounds a single HTTP call, not
    /// the whole retry sequence.
    pub timeout_ms: u64,
    /// Total number of attempts per dispatch, including the first one.
    pub max_retries: usize,
    /// Base backoff in milliseconds, scaled by `attempt * 6 - 5`.
    pub sleep_duration_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            sleep_duration_ms: 10_000,
        }
    }
}

impl ClientOptions {
    /// Reads options from the environment, keeping defaults for unset
    /// variables.
    ///
    /// Reads:
    /// - `MARKETO_HTTP_TIMEOUT_MS`
    /// - `MARKETO_HTTP_MAX_RETRIES`
    /// - `MARKETO_HTTP_SLEEP_MS`
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(value) = parse_var(&lookup, "MARKETO_HTTP_TIMEOUT_MS")? {
            options.timeout_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "MARKETO_HTTP_MAX_RETRIES")? {
            options.max_retries = value;
        }
        if let Some(value) = parse_var(&lookup, "MARKETO_HTTP_SLEEP_MS")? {
            options.sleep_duration_ms = value;
        }
        Ok(options)
    }

    /// Number of attempts a dispatch may issue. Never less than one.
    pub fn attempts(&self) -> usize {
        self.max_retries.max(1)
    }

    /// Delay slept after failed attempt `attempt` (1-based).
    ///
    /// Attempt 1 waits one base unit, attempt 2 waits seven, attempt 3
    /// thirteen.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let multiplier = (attempt.max(1) as u64).saturating_mul(6).saturating_sub(5);
        Duration::from_millis(self.sleep_duration_ms.saturating_mul(multiplier))
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> std::result::Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} must be a non-negative integer, got '{raw}'")),
    }
}
