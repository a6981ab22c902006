use std::time::Duration;

use flowwatch_core::execution::DEFAULT_SYNC_LIMIT;

/// Default seconds between scheduled monitoring passes.
const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Default number of instances processed concurrently within one pass.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default per-instance time budget in seconds.
const DEFAULT_INSTANCE_TIMEOUT_SECS: u64 = 120;

/// Default timeout for a single request to a remote instance.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Monitoring pass configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Whether the in-process scheduler runs passes on its own.
    pub enabled: bool,
    /// Time between scheduled passes.
    pub interval: Duration,
    /// Executions fetched per instance per pass.
    pub execution_limit: i64,
    /// Instances processed concurrently within one pass.
    pub max_concurrency: usize,
    /// Upper bound on the work spent on one instance per pass.
    pub instance_timeout: Duration,
    /// Timeout for a single request to a remote instance.
    pub http_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            execution_limit: DEFAULT_SYNC_LIMIT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            instance_timeout: Duration::from_secs(DEFAULT_INSTANCE_TIMEOUT_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl MonitorConfig {
    /// Load from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    ///
    /// | Env var                          | Default |
    /// |----------------------------------|---------|
    /// | `MONITOR_ENABLED`                | `true`  |
    /// | `MONITOR_INTERVAL_SECS`          | `60`    |
    /// | `MONITOR_EXECUTION_LIMIT`        | `100`   |
    /// | `MONITOR_MAX_CONCURRENCY`        | `4`     |
    /// | `MONITOR_INSTANCE_TIMEOUT_SECS`  | `120`   |
    /// | `N8N_HTTP_TIMEOUT_SECS`          | `30`    |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_parse("MONITOR_ENABLED").unwrap_or(defaults.enabled),
            interval: env_parse("MONITOR_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            execution_limit: env_parse("MONITOR_EXECUTION_LIMIT")
                .map(|limit: i64| limit.clamp(1, flowwatch_core::execution::MAX_SYNC_LIMIT))
                .unwrap_or(defaults.execution_limit),
            max_concurrency: env_parse("MONITOR_MAX_CONCURRENCY")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrency),
            instance_timeout: env_parse("MONITOR_INSTANCE_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.instance_timeout),
            http_timeout: env_parse("N8N_HTTP_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = MonitorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.execution_limit, 100);
        assert!(config.max_concurrency > 0);
        assert!(config.http_timeout < config.instance_timeout);
    }
}
