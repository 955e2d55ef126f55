//! Global tracing subscriber setup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::LoggingError;

/// Installs the global subscriber: an `EnvFilter` (`RUST_LOG` wins over
/// the configured directive) and a plain or JSON fmt layer on stderr.
/// Records emitted through the `log` crate are forwarded into tracing.
///
/// Only the first call installs anything; later calls return
/// `LoggingError::AlreadyInitialized`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok(), config)?;

    let plain = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));
    let json = config.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json);

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| LoggingError::AlreadyInitialized)?;
    tracing_log::LogTracer::init().map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(())
}

fn build_filter(env: Option<String>, config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Some(directive) = env.filter(|d| !d.trim().is_empty()) {
        if let Ok(filter) = EnvFilter::try_new(&directive) {
            return Ok(filter);
        }
    }

    EnvFilter::try_new(&config.filter).map_err(|e| LoggingError::InvalidFilter {
        filter: config.filter.clone(),
        reason: e.to_string(),
    })
}
