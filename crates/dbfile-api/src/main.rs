use dbfile_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Database, storage backends, form-state signer and routes
    let (_state, router) = dbfile_api::setup::initialize_app(config.clone()).await?;

    dbfile_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
