use anyhow::Context;
use hookah_catalog::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config)?;

    if config.uses_default_jwt_secret() {
        if config.service.environment == "production" {
            anyhow::bail!("jwt.secret must be set in production");
        }
        tracing::warn!("Using the built-in development JWT secret");
    }

    let state = AppState::new(config.clone())?;
    if config.seed_demo_data {
        state.store().seed_demo().await?;
        tracing::info!("Demo catalog loaded");
    }

    Server::new(config).serve(app(state)).await?;
    Ok(())
}
