use crate::error::{EmbedError, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ANNOUNCEKIT_LOG";
const DEFAULT_FILTER: &str = "info";

/// Installs a stderr subscriber. Stdout is reserved for shell packets.
///
/// Filter precedence: `ANNOUNCEKIT_LOG`, then `RUST_LOG`, then `info`.
pub fn init_logging() -> Result<()> {
    let filter = resolve_filter(
        std::env::var(LOG_ENV).ok(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
    );
    let filter = EnvFilter::try_new(&filter).map_err(|err| {
        EmbedError::Logging(format!("invalid log filter '{filter}': {err}"))
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| EmbedError::Logging(err.to_string()))
}

fn resolve_filter(own: Option<String>, rust_log: Option<String>) -> String {
    own.filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_variable_wins() {
        assert_eq!(
            resolve_filter(Some("debug".to_string()), Some("warn".to_string())),
            "debug"
        );
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        assert_eq!(resolve_filter(Some(" ".to_string()), Some("warn".to_string())), "warn");
        assert_eq!(resolve_filter(None, None), "info");
    }
}
