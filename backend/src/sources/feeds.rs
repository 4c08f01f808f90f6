//! The three upstream feeds and how each one is read.
//!
//! - Spot: chart API, USD per troy ounce.
//! - Conversion: chart API, INR per USD.
//! - Secondary: exchange quote API for the silver ETF, INR per unit.
//!
//! Every feed prefers its JSON path and keeps pattern strategies for when
//! the upstream serves a quote page instead (consent walls, format changes).

use reqwest::header::{ACCEPT, HeaderName, REFERER, USER_AGENT};

use crate::config::SourceConfig;
use crate::sources::client::HttpSource;
use crate::sources::errors::SourceError;
use crate::sources::parser::Extractor;
use crate::sources::patterns::ExtractionStrategy;

/// Upstreams serve bots an empty page; look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";

pub const CHART_PRICE_PATH: &str = "chart.result.0.meta.regularMarketPrice";
pub const EXCHANGE_PRICE_PATH: &str = "priceInfo.lastPrice";

const SECONDARY_REFERER: &str = "https://www.nseindia.com/get-quote/equity/SILVERBEES";

pub fn chart_strategies() -> Vec<ExtractionStrategy> {
    vec![
        ExtractionStrategy::labeled_attribute("market-price-attribute", "regularMarketPrice"),
        ExtractionStrategy::quoted_key("market-price-key", "regularMarketPrice"),
        ExtractionStrategy::quoted_key("price-key", "price"),
    ]
}

pub fn exchange_strategies() -> Vec<ExtractionStrategy> {
    vec![
        ExtractionStrategy::quoted_key("last-price-key", "lastPrice"),
        ExtractionStrategy::labeled_attribute("market-price-attribute", "regularMarketPrice"),
        ExtractionStrategy::near_keyword("last-price-text", "last price", 48),
    ]
}

pub fn spot_feed(cfg: &SourceConfig) -> Result<HttpSource, SourceError> {
    HttpSource::new(
        "spot",
        cfg,
        &json_headers(),
        Extractor::new(Some(CHART_PRICE_PATH), chart_strategies()),
    )
}

pub fn conversion_feed(cfg: &SourceConfig) -> Result<HttpSource, SourceError> {
    HttpSource::new(
        "conversion",
        cfg,
        &json_headers(),
        Extractor::new(Some(CHART_PRICE_PATH), chart_strategies()),
    )
}

pub fn secondary_feed(cfg: &SourceConfig) -> Result<HttpSource, SourceError> {
    HttpSource::new(
        "secondary",
        cfg,
        &[
            (USER_AGENT, BROWSER_USER_AGENT),
            (ACCEPT, "*/*"),
            (REFERER, SECONDARY_REFERER),
        ],
        Extractor::new(Some(EXCHANGE_PRICE_PATH), exchange_strategies()),
    )
}

fn json_headers() -> [(HeaderName, &'static str); 2] {
    [(USER_AGENT, BROWSER_USER_AGENT), (ACCEPT, "application/json")]
}
