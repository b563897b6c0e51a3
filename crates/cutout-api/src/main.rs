use cutout_api::setup;
use cutout_core::Config;

// mimalloc as the global allocator for lower fragmentation in long-running containers
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (state, router) = setup::initialize_app(config)?;

    setup::server::start_server(&state, router).await?;

    Ok(())
}
