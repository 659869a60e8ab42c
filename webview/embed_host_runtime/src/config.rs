use std::time::Duration;

pub const DEFAULT_PRIMING_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SHELL_TO_HOST_CAP: usize = 1_048_576;
pub const DEFAULT_HOST_TO_SHELL_CAP: usize = 1_048_576;
pub const DEFAULT_OUTBOUND_QUEUE_CAP: usize = 256;

pub const PRIMING_TIMEOUT_ENV: &str = "ANNOUNCEKIT_PRIMING_TIMEOUT_MS";
pub const SHELL_TO_HOST_CAP_ENV: &str = "ANNOUNCEKIT_SHELL_TO_HOST_CAP";
pub const HOST_TO_SHELL_CAP_ENV: &str = "ANNOUNCEKIT_HOST_TO_SHELL_CAP";
pub const OUTBOUND_QUEUE_CAP_ENV: &str = "ANNOUNCEKIT_OUTBOUND_QUEUE_CAP";

/// Runtime knobs. Unset, unparsable or zero values fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    pub priming_timeout: Duration,
    pub shell_to_host_cap: usize,
    pub host_to_shell_cap: usize,
    pub outbound_queue_cap: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            priming_timeout: Duration::from_millis(DEFAULT_PRIMING_TIMEOUT_MS),
            shell_to_host_cap: DEFAULT_SHELL_TO_HOST_CAP,
            host_to_shell_cap: DEFAULT_HOST_TO_SHELL_CAP,
            outbound_queue_cap: DEFAULT_OUTBOUND_QUEUE_CAP,
        }
    }
}

impl EmbedConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<L>(lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            priming_timeout: parse_positive(&lookup, PRIMING_TIMEOUT_ENV)
                .map(Duration::from_millis)
                .unwrap_or(defaults.priming_timeout),
            shell_to_host_cap: parse_positive(&lookup, SHELL_TO_HOST_CAP_ENV)
                .unwrap_or(defaults.shell_to_host_cap),
            host_to_shell_cap: parse_positive(&lookup, HOST_TO_SHELL_CAP_ENV)
                .unwrap_or(defaults.host_to_shell_cap),
            outbound_queue_cap: parse_positive(&lookup, OUTBOUND_QUEUE_CAP_ENV)
                .unwrap_or(defaults.outbound_queue_cap),
        }
    }
}

fn parse_positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr + Default + PartialOrd,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> EmbedConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        EmbedConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_values_use_defaults() {
        assert_eq!(config_from(&[]), EmbedConfig::default());
    }

    #[test]
    fn valid_values_override_defaults() {
        let config = config_from(&[
            (PRIMING_TIMEOUT_ENV, "2500"),
            (OUTBOUND_QUEUE_CAP_ENV, " 16 "),
            (SHELL_TO_HOST_CAP_ENV, "4096"),
        ]);
        assert_eq!(config.priming_timeout, Duration::from_millis(2500));
        assert_eq!(config.outbound_queue_cap, 16);
        assert_eq!(config.shell_to_host_cap, 4096);
        assert_eq!(config.host_to_shell_cap, DEFAULT_HOST_TO_SHELL_CAP);
    }

    #[test]
    fn zero_and_garbage_fall_back() {
        let config = config_from(&[(OUTBOUND_QUEUE_CAP_ENV, "0"), (PRIMING_TIMEOUT_ENV, "soon")]);
        assert_eq!(config.outbound_queue_cap, DEFAULT_OUTBOUND_QUEUE_CAP);
        assert_eq!(
            config.priming_timeout,
            Duration::from_millis(DEFAULT_PRIMING_TIMEOUT_MS)
        );
    }
}
