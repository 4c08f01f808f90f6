use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::AppConfig;
use crate::db::Db;
use crate::metrics::Counters;
use crate::pipeline::controller::{CycleSettings, CycleSources, IngestionController};
use crate::pipeline::margin::{FixedMargin, MarginFile, MarginSource};
use crate::service::PriceService;
use crate::sources::feeds::{conversion_feed, secondary_feed, spot_feed};
use crate::store::{PriceStore, SqlxPriceStore};

/// Everything a binary needs, wired from one `AppConfig`.
pub struct App {
    pub controller: Arc<IngestionController>,
    pub service: PriceService,
    pub counters: Counters,
}

impl App {
    pub async fn build(cfg: &AppConfig) -> anyhow::Result<Self> {
        cfg.validate().context("invalid configuration")?;

        let db = Db::connect(&cfg.database_url).await?;
        db.migrate().await?;
        let store: Arc<dyn PriceStore> = Arc::new(SqlxPriceStore::new(db.pool.clone()));

        let sources = CycleSources {
            spot: Arc::new(spot_feed(&cfg.spot).context("building spot source")?),
            conversion: Arc::new(
                conversion_feed(&cfg.conversion).context("building conversion source")?,
            ),
            secondary: Arc::new(
                secondary_feed(&cfg.secondary).context("building secondary source")?,
            ),
        };

        let margin: Arc<dyn MarginSource> = match &cfg.margin_file {
            Some(path) => Arc::new(MarginFile::new(path)),
            None => Arc::new(FixedMargin(cfg.defaults.margin)),
        };

        let counters = Counters::default();
        let controller = Arc::new(IngestionController::new(
            sources,
            Arc::clone(&store),
            margin,
            CycleSettings::from_config(cfg),
            counters.clone(),
        ));

        info!(
            policy = ?cfg.cycle_policy,
            unit_conversion_constant = cfg.unit_conversion_constant,
            every_secs = cfg.scrape_interval.as_secs(),
            "ingestion pipeline ready"
        );

        Ok(Self {
            service: PriceService::new(Arc::clone(&controller), store),
            controller,
            counters,
        })
    }
}
