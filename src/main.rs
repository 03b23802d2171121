#![warn(clippy::all)]
use askboard::{config, init_tracing, run, setup_store};

#[tokio::main]
async fn main() -> Result<(), handle_errors::Error> {
    dotenv::dotenv().ok();
    let config = config::Config::new()?;
    init_tracing(&config);

    let store = setup_store(&config).await?;
    tracing::info!("askboard build ID {}", env!("ASKBOARD_VERSION"));
    run(config, store).await;
    Ok(())
}
