use argentum_backend::{app::App, config::AppConfig, pipeline::spawn_schedule};
use argentum_common::logger::init_logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("argentum-backend", is_production);

    let cfg = AppConfig::from_env();

    tracing::info!("Starting argentum backend...");

    let app = App::build(&cfg).await?;

    // First cycle runs immediately, then every `scrape_interval`.
    let schedule = spawn_schedule(app.controller.clone(), cfg.scrape_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    schedule.shutdown().await;
    tracing::info!(counters = ?app.counters.snapshot(), "argentum backend stopped");

    Ok(())
}
