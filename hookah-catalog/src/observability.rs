//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    error::{Error, Result},
};

/// Install the global JSON subscriber filtered by `service.log_level`.
///
/// `RUST_LOG` is not consulted; an invalid directive falls back to `info`.
pub fn init_tracing(config: &Config) -> Result<()> {
    let log_level = &config.service.log_level;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .map_err(|e| Error::Internal(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        service = %config.service.name,
        environment = %config.service.environment,
        "Tracing initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error() {
        let config = Config::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
