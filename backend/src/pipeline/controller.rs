//! Ingestion cycle controller.
//!
//! One cycle runs four stages strictly in order:
//! FETCH -> VALIDATE -> RESOLVE -> DERIVE_AND_PERSIST.
//!
//! Guarantees:
//! - At most one cycle runs at a time (scheduled or on-demand). The
//!   "previous record" every cycle falls back on is therefore never racing
//!   another cycle's append.
//! - A cycle appends exactly one complete record, or none.
//! - Source, parse and plausibility failures are absorbed by the resolver;
//!   only store failures (and configuration defects) abandon a cycle.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use argentum_common::logger::{TraceId, child_span, root_span, warn_if_slow};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{Instrument, debug, error, field, info, warn};

use crate::config::{AppConfig, CyclePolicy, FieldBounds, FieldDefaults};
use crate::error::CycleError;
use crate::metrics::Counters;
use crate::model::PriceRecord;
use crate::pipeline::derivation::build_record;
use crate::pipeline::margin::MarginSource;
use crate::pipeline::resolver::{Field, FreshValues, Tier, resolve_fields};
use crate::pipeline::validator::{Bounds, validate};
use crate::sources::activity::extract_activity;
use crate::sources::types::{SourceAdapter, SourceResult};
use crate::store::PriceStore;

/// Appends slower than this are reported on the `performance` target.
const SLOW_APPEND: Duration = Duration::from_millis(500);

/// The three upstream feeds of one cycle.
#[derive(Clone)]
pub struct CycleSources {
    pub spot: Arc<dyn SourceAdapter>,
    pub conversion: Arc<dyn SourceAdapter>,
    pub secondary: Arc<dyn SourceAdapter>,
}

#[derive(Clone, Debug)]
pub struct CycleSettings {
    pub bounds: FieldBounds,
    pub defaults: FieldDefaults,
    pub unit_conversion_constant: f64,
    pub policy: CyclePolicy,
}

impl CycleSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            bounds: cfg.bounds,
            defaults: cfg.defaults,
            unit_conversion_constant: cfg.unit_conversion_constant,
            policy: cfg.cycle_policy,
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleTrigger {
    Scheduled,
    OnDemand,
}

impl fmt::Display for CycleTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CycleTrigger::Scheduled => "scheduled",
            CycleTrigger::OnDemand => "on_demand",
        })
    }
}

pub struct IngestionController {
    sources: CycleSources,
    store: Arc<dyn PriceStore>,
    margin: Arc<dyn MarginSource>,
    settings: CycleSettings,
    counters: Counters,

    /// Held for the whole cycle.
    gate: Mutex<()>,
}

impl IngestionController {
    pub fn new(
        sources: CycleSources,
        store: Arc<dyn PriceStore>,
        margin: Arc<dyn MarginSource>,
        settings: CycleSettings,
        counters: Counters,
    ) -> Self {
        Self {
            sources,
            store,
            margin,
            settings,
            counters,
            gate: Mutex::new(()),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// On-demand cycle.
    ///
    /// With [`CyclePolicy::Coalesce`] a trigger that finds a cycle in flight
    /// returns [`CycleError::Busy`] immediately. With [`CyclePolicy::Queue`]
    /// it waits for that cycle and then runs its own, which sees the
    /// finished cycle's record as "previous".
    pub async fn trigger(&self) -> Result<PriceRecord, CycleError> {
        let _guard = match self.settings.policy {
            CyclePolicy::Coalesce => match self.gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    Counters::incr(&self.counters.busy_rejections);
                    info!("on-demand trigger rejected: cycle in flight");
                    return Err(CycleError::Busy);
                }
            },
            CyclePolicy::Queue => match self.gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("on-demand trigger queued behind in-flight cycle");
                    self.gate.lock().await
                }
            },
        };

        self.run_cycle(CycleTrigger::OnDemand).await
    }

    /// Scheduled cycle. Returns `None` when a cycle was already in flight;
    /// the next tick is the retry.
    pub async fn run_scheduled(&self) -> Option<Result<PriceRecord, CycleError>> {
        let Ok(_guard) = self.gate.try_lock() else {
            Counters::incr(&self.counters.scheduled_skips);
            info!("scheduled tick skipped: cycle in flight");
            return None;
        };

        Some(self.run_cycle(CycleTrigger::Scheduled).await)
    }

    /// Caller must hold `gate`.
    async fn run_cycle(&self, trigger: CycleTrigger) -> Result<PriceRecord, CycleError> {
        let trace_id = TraceId::new();
        let span = root_span("ingestion_cycle", &trace_id);
        span.record("trigger", field::display(trigger));

        async move {
            let started = Instant::now();
            let out = self.cycle_stages().await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &out {
                Ok(record) => {
                    Counters::incr(&self.counters.cycles_completed);
                    info!(
                        id = record.id,
                        spot_price_foreign = record.spot_price_foreign,
                        conversion_rate = record.conversion_rate,
                        local_price = record.local_price,
                        elapsed_ms,
                        "cycle completed"
                    );
                }
                Err(e) => {
                    Counters::incr(&self.counters.cycles_failed);
                    error!(error = %e, elapsed_ms, "cycle abandoned; no record appended");
                }
            }

            out
        }
        .instrument(span)
        .await
    }

    async fn cycle_stages(&self) -> Result<PriceRecord, CycleError> {
        // FETCH
        let previous = self.store.latest().await.map_err(CycleError::StoreRead)?;

        let (spot, conversion, secondary, margin) = tokio::join!(
            fetch_source(self.sources.spot.as_ref(), &self.counters),
            fetch_source(self.sources.conversion.as_ref(), &self.counters),
            fetch_source(self.sources.secondary.as_ref(), &self.counters),
            self.read_margin(),
        );

        // VALIDATE
        let bounds = self.settings.bounds;
        let fresh = FreshValues {
            spot: self.checked(Field::SpotPrice, spot.value, bounds.spot),
            conversion: self.checked(Field::ConversionRate, conversion.value, bounds.conversion),
            secondary: self.checked(Field::SecondaryPrice, secondary.value, bounds.secondary),
            margin: self.checked(Field::Margin, margin, bounds.margin),
            activity: spot.raw.as_ref().and_then(extract_activity),
        };

        // RESOLVE
        let resolved = resolve_fields(fresh, previous.as_ref(), &self.settings.defaults)?;
        for (field, tier) in resolved.tiers() {
            self.counters.record_tier(tier);
            if tier != Tier::Fresh {
                info!(field = %field, tier = %tier, "field resolved by fallback");
            }
        }

        // DERIVE_AND_PERSIST
        let record = build_record(resolved, self.settings.unit_conversion_constant);
        warn_if_slow("store_append", SLOW_APPEND, self.store.append(record))
            .await
            .map_err(CycleError::Persistence)
    }

    async fn read_margin(&self) -> Option<f64> {
        match self.margin.current_margin().await {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %format!("{e:#}"), "margin unavailable; falling back");
                None
            }
        }
    }

    fn checked(&self, field: Field, value: Option<f64>, bounds: Bounds) -> Option<f64> {
        let out = validate(field, value?, bounds);
        if out.is_none() {
            Counters::incr(&self.counters.implausible_values);
        }
        out
    }
}

/// Runs one adapter under its own timeout. Never fails.
async fn fetch_source(source: &dyn SourceAdapter, counters: &Counters) -> SourceResult {
    let limit = source.timeout();

    let result = timeout(limit, source.fetch())
        .instrument(child_span("fetch_source"))
        .await;

    match result {
        Ok(result) => {
            if result.value.is_none() {
                Counters::incr(&counters.source_failures);
            }
            result
        }
        Err(_) => {
            Counters::incr(&counters.source_failures);
            warn!(
                source = source.name(),
                timeout_ms = limit.as_millis() as u64,
                "source timed out; treated as failed"
            );
            SourceResult::absent()
        }
    }
}
