use pos_server::api::server;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logger (set RUST_LOG=debug for verbose output, RUST_LOG=info for normal)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Read bind address from environment variable
    // Use BIND_ADDRESS=127.0.0.1:8030 for local development
    let addr = env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8030".to_string());

    log::info!("Starting point-of-sale payment server on {}", addr);
    server::start_server(&addr).await?;
    Ok(())
}
