use mediatag_api::setup;
use mediatag_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router).await?;

    state.services.monitor.shutdown().await;
    tracing::info!("Job monitor stopped");

    Ok(())
}
