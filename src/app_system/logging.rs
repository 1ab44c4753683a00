use tracing_subscriber::fmt::time::uptime;
use tracing_subscriber::EnvFilter;

use super::LoggingConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Panics if a subscriber is
/// already installed.
pub fn setup_tracing(config: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(uptime());

    if config.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
