use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "ember_engine=debug,wgpu=warn"). When unset, `RUST_LOG` is used, then
/// `info`.
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl LoggingConfig {
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; subsequent calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        match resolve_filter(config.env_filter, std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(log::LevelFilter::Info);
            }
        }

        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            log::warn!("a global logger was already installed; keeping it");
            return;
        }

        log::debug!("logging initialized");
    });
}

/// Explicit filter first, then the environment. Blank filters count as unset.
fn resolve_filter(explicit: Option<String>, env: Option<String>) -> Option<String> {
    explicit
        .filter(|f| !f.trim().is_empty())
        .or_else(|| env.filter(|f| !f.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_env() {
        let got = resolve_filter(Some("warn".into()), Some("trace".into()));
        assert_eq!(got.as_deref(), Some("warn"));
    }

    #[test]
    fn env_filter_used_when_unset_or_blank() {
        assert_eq!(resolve_filter(None, Some("debug".into())).as_deref(), Some("debug"));
        assert_eq!(
            resolve_filter(Some("  ".into()), Some("debug".into())).as_deref(),
            Some("debug")
        );
        assert_eq!(resolve_filter(None, Some(String::new())), None);
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::with_filter("ember_engine=debug"));
        init_logging(LoggingConfig::default());
    }
}
