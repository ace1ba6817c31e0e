use anyhow::Context;
use player_service::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config);

    let state = AppState::builder()
        .config(config)
        .build()
        .await
        .context("failed to open the database")?;

    Server::new(state)
        .context("failed to set up JWT authentication")?
        .serve()
        .await?;

    shutdown_tracing();
    Ok(())
}
