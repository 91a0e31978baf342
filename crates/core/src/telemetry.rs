//! Tracing configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{Error, Result};

/// Configure stdout logging with an environment-driven filter.
///
/// `RUST_LOG` overrides the default `info,codebox=debug` filter.
pub fn configure_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,codebox=debug".into()),
    );

    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("failed to install tracing subscriber: {}", e)))?;

    Ok(())
}
