#![allow(dead_code)]

use std::future::pending;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Notify;

use argentum_backend::{
    error::StoreError,
    metrics::Counters,
    model::{NewPriceRecord, PriceRecord},
    pipeline::{
        CycleSources, IngestionController, controller::CycleSettings, margin::MarginSource,
    },
    sources::{SourceAdapter, SourceResult},
    store::PriceStore,
};

// -----------------------
// Store
// -----------------------

/// Vec-backed store with failure toggles.
#[derive(Default)]
pub struct InMemoryPriceStore {
    records: Mutex<Vec<PriceRecord>>,
    pub fail_appends: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl InMemoryPriceStore {
    pub fn with_records(records: Vec<PriceRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn all(&self) -> Vec<PriceRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn append(&self, record: NewPriceRecord) -> Result<PriceRecord, StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("append disabled".into()));
        }

        let mut records = self.records.lock().unwrap();
        let now = Utc::now();
        let timestamp = match records.last() {
            Some(last) if last.timestamp >= now => last.timestamp + TimeDelta::microseconds(1),
            _ => now,
        };
        let id = records.last().map_or(1, |r| r.id + 1);

        let stored = PriceRecord::from_new(id, timestamp, record);
        records.push(stored.clone());
        Ok(stored)
    }

    async fn latest(&self) -> Result<Option<PriceRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(self.records.lock().unwrap().last().cloned())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        let records = self.records.lock().unwrap();
        let skip = records.len().saturating_sub(limit);
        Ok(records[skip..].to_vec())
    }
}

pub fn stored_record(spot: f64, rate: f64, margin: f64, timestamp: DateTime<Utc>) -> PriceRecord {
    PriceRecord {
        id: 1,
        spot_price_foreign: spot,
        local_price: spot / 31.3 * rate + margin,
        conversion_rate: rate,
        secondary_instrument_price: None,
        margin,
        activity_info: None,
        timestamp,
    }
}

// -----------------------
// Sources
// -----------------------

/// Always returns the same outcome. `None` models a fetch or parse failure.
pub struct StaticSource {
    pub name: &'static str,
    pub value: Option<f64>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &'static str, value: Option<f64>) -> Arc<Self> {
        Arc::new(Self {
            name,
            value,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn fetch(&self) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        SourceResult {
            value: self.value,
            raw: None,
        }
    }
}

/// Never answers; only its timeout ends the fetch.
pub struct HangingSource {
    pub timeout: Duration,
}

#[async_trait]
impl SourceAdapter for HangingSource {
    fn name(&self) -> &str {
        "hanging"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self) -> SourceResult {
        pending::<SourceResult>().await
    }
}

/// Holds its first fetch until released. Later fetches answer immediately.
pub struct GatedSource {
    pub value: f64,
    pub entered: Notify,
    pub release: Notify,
    calls: AtomicUsize,
}

impl GatedSource {
    pub fn new(value: f64) -> Arc<Self> {
        Arc::new(Self {
            value,
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn fetch(&self) -> SourceResult {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            self.release.notified().await;
        }
        SourceResult::value(self.value)
    }
}

// -----------------------
// Margin
// -----------------------

pub struct FailingMargin;

#[async_trait]
impl MarginSource for FailingMargin {
    async fn current_margin(&self) -> anyhow::Result<f64> {
        anyhow::bail!("margin backend down")
    }
}

// -----------------------
// Wiring
// -----------------------

pub fn sources(
    spot: Arc<dyn SourceAdapter>,
    conversion: Arc<dyn SourceAdapter>,
    secondary: Arc<dyn SourceAdapter>,
) -> CycleSources {
    CycleSources {
        spot,
        conversion,
        secondary,
    }
}

pub fn controller(
    sources: CycleSources,
    store: Arc<InMemoryPriceStore>,
    margin: Arc<dyn MarginSource>,
    settings: CycleSettings,
) -> Arc<IngestionController> {
    Arc::new(IngestionController::new(
        sources,
        store,
        margin,
        settings,
        Counters::default(),
    ))
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}
