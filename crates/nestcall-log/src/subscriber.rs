//! Centralized `tracing-subscriber` setup, so every binary in the workspace installs
//! the same filter precedence instead of reinventing it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// The baseline filter applied before any config-file or `RUST_LOG` directive is
/// layered on top. Keeps third-party crates quiet by default without silencing our
/// own `nestcall` targets.
const DEFAULT_DIRECTIVES: &str = "warn,nestcall=info";

/// Whether the fmt layer renders human-readable text or newline-delimited JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Full,
    Json,
}

/// Installs the global `tracing` subscriber.
///
/// Filter precedence, low to high: [`DEFAULT_DIRECTIVES`], then `config_directives`
/// (from the loaded settings file), then the `RUST_LOG` environment variable.
///
/// Returns an error if a subscriber has already been installed, so callers should
/// only invoke this once at process startup.
pub fn init_subscriber(
    format: LogFormat,
    config_directives: Option<&[String]>,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = build_filter(config_directives);

    let registry = Registry::default().with(filter);

    match format {
        LogFormat::Full => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    }
}

fn build_filter(config_directives: Option<&[String]>) -> EnvFilter {
    let mut directives = DEFAULT_DIRECTIVES.to_owned();

    if let Some(config_directives) = config_directives {
        if !config_directives.is_empty() {
            directives = [directives, config_directives.join(",")].join(",");
        }
    }

    if let Ok(env_directives) = std::env::var(EnvFilter::DEFAULT_ENV) {
        if !env_directives.is_empty() {
            directives = [directives, env_directives].join(",");
        }
    }

    EnvFilter::new(directives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_directives_are_appended_to_the_default() {
        let filter = build_filter(Some(&["nestcall_call_core=debug".to_owned()]));
        assert!(filter.to_string().contains("nestcall_call_core=debug"));
        assert!(filter.to_string().contains(DEFAULT_DIRECTIVES));
    }

    #[test]
    fn absent_config_directives_fall_back_to_the_default_alone() {
        let filter = build_filter(None);
        assert_eq!(filter.to_string(), DEFAULT_DIRECTIVES);
    }
}
