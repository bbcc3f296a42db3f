use tracing_forest::ForestLayer;
use tracing_subscriber::{filter, prelude::*, EnvFilter};

use super::LogCfg;

pub trait HttpTracingExt: tracing::Subscriber {
    /// Silences per-request `tower_http` logs unless `enabled`.
    fn with_http_tracing(
        self,
        enabled: bool,
    ) -> tracing_subscriber::layer::Layered<filter::Targets, Self>
    where
        Self: Sized,
    {
        let http_level = if enabled {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        };
        self.with(
            filter::Targets::new()
                .with_target("tower_http", http_level)
                .with_default(tracing::Level::TRACE),
        )
    }
}

impl<S: tracing::Subscriber> HttpTracingExt for S {}

/// Installs the global subscriber: env filter (falling back to `log.filter`) and a forest layer.
pub fn init(log: &LogCfg) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ForestLayer::default())
        .with_http_tracing(log.http_requests)
        .try_init()?;
    Ok(())
}
