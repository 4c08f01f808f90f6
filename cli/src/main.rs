pub mod cli;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use argentum_backend::{
    app::App, config::AppConfig, pipeline::spawn_schedule, service::TriggerOutcome,
};
use argentum_common::logger::init_logger;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("argentum-cli", cli.json_logs || is_production);

    let cfg = AppConfig::from_env();
    let app = App::build(&cfg).await?;

    match cli.command {
        Command::Serve => {
            let schedule = spawn_schedule(app.controller.clone(), cfg.scrape_interval);
            tokio::signal::ctrl_c().await?;
            tracing::info!("Shutdown signal received");
            schedule.shutdown().await;
            print_json(&app.counters.snapshot())?;
        }

        Command::Scrape => match app.service.trigger().await.context("ingestion cycle failed")? {
            TriggerOutcome::Completed(record) => print_json(&record)?,
            TriggerOutcome::Busy => print_json(&json!({ "status": "busy" }))?,
        },

        Command::Latest => {
            let latest = app.service.latest().await.context("reading latest record")?;
            print_json(&latest)?;
        }

        Command::History { limit } => {
            let limit = limit.unwrap_or(cfg.history_limit);
            let records = app.service.recent(limit).await.context("reading history")?;
            print_json(&records)?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
