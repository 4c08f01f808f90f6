mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;

use argentum_backend::{
    config::{AppConfig, CyclePolicy, FieldDefaults},
    error::CycleError,
    pipeline::{
        controller::CycleSettings,
        derivation::derive_local_price,
        margin::{FixedMargin, MarginSource},
        spawn_schedule,
    },
    service::{PriceService, TriggerOutcome},
    store::PriceStore,
};
use support::*;

fn fixed_margin(v: f64) -> Arc<dyn MarginSource> {
    Arc::new(FixedMargin(v))
}

// -----------------------
// Happy path
// -----------------------

#[tokio::test]
async fn all_sources_fresh_appends_derived_record() {
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", Some(71.20)),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let record = ctl.trigger().await.unwrap();

    assert_eq!(record.spot_price_foreign, 24.10);
    assert_eq!(record.conversion_rate, 86.40);
    assert_eq!(record.secondary_instrument_price, Some(71.20));
    assert_eq!(record.margin, 2.0);
    assert_close(record.local_price, 68.5252);

    assert_eq!(store.all(), vec![record]);

    let snap = ctl.counters().snapshot();
    assert_eq!(snap.cycles_completed, 1);
    assert_eq!(snap.source_failures, 0);
    assert_eq!(snap.fallback_previous, 0);
    assert_eq!(snap.fallback_default, 0);
}

// -----------------------
// Fallback
// -----------------------

#[tokio::test(start_paused = true)]
async fn timed_out_spot_carries_previous_value_forward() {
    let store = Arc::new(InMemoryPriceStore::with_records(vec![stored_record(
        23.80,
        85.0,
        2.0,
        Utc::now(),
    )]));
    let ctl = controller(
        sources(
            Arc::new(HangingSource {
                timeout: Duration::from_secs(3),
            }),
            StaticSource::new("conversion", Some(92.0)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let record = ctl.trigger().await.unwrap();

    assert_eq!(record.spot_price_foreign, 23.80);
    assert_eq!(record.conversion_rate, 92.0);
    assert_close(record.local_price, 23.80 / 31.3 * 92.0 + 2.0);
    assert_eq!(store.len(), 2);

    let snap = ctl.counters().snapshot();
    assert_eq!(snap.source_failures, 2);
    assert_eq!(snap.fallback_previous, 1);
}

#[tokio::test]
async fn implausible_spot_is_replaced_by_previous() {
    let store = Arc::new(InMemoryPriceStore::with_records(vec![stored_record(
        23.80,
        86.0,
        2.0,
        Utc::now(),
    )]));
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(9999.99)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", Some(71.20)),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let record = ctl.trigger().await.unwrap();

    assert_eq!(record.spot_price_foreign, 23.80);
    assert_eq!(record.conversion_rate, 86.40);
    assert_eq!(ctl.counters().snapshot().implausible_values, 1);
}

#[tokio::test]
async fn empty_store_and_dead_sources_fall_back_to_defaults() {
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", None),
            StaticSource::new("conversion", None),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        Arc::new(FailingMargin),
        CycleSettings::default(),
    );

    let record = ctl.trigger().await.unwrap();
    let d = FieldDefaults::default();

    assert_eq!(record.spot_price_foreign, d.spot);
    assert_eq!(record.conversion_rate, d.conversion);
    assert_eq!(record.margin, d.margin);
    assert_eq!(record.secondary_instrument_price, None);
    assert_eq!(
        record.local_price,
        derive_local_price(d.spot, 31.3, d.conversion, d.margin)
    );
    assert_eq!(store.len(), 1);
    assert_eq!(ctl.counters().snapshot().fallback_default, 4);
}

#[tokio::test]
async fn unreadable_margin_on_first_cycle_uses_configured_default() {
    let cfg = AppConfig {
        defaults: FieldDefaults {
            margin: 4.0,
            ..FieldDefaults::default()
        },
        ..AppConfig::default()
    };
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        Arc::new(FailingMargin),
        CycleSettings::from_config(&cfg),
    );

    let record = ctl.trigger().await.unwrap();

    assert_eq!(record.margin, 4.0);
    assert_close(record.local_price, 24.10 / 31.3 * 86.40 + 4.0);
}

#[tokio::test]
async fn non_finite_default_abandons_cycle() {
    let store = Arc::new(InMemoryPriceStore::default());
    let mut settings = CycleSettings::default();
    settings.defaults.conversion = f64::NAN;

    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", None),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        settings,
    );

    let err = ctl.trigger().await.unwrap_err();

    assert!(matches!(err, CycleError::ResolutionExhausted { .. }));
    assert_eq!(store.len(), 0);
}

// -----------------------
// Store failures
// -----------------------

#[tokio::test]
async fn failed_append_leaves_series_untouched() {
    let store = Arc::new(InMemoryPriceStore::default());
    store.fail_appends.store(true, Ordering::SeqCst);

    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let err = ctl.trigger().await.unwrap_err();

    assert!(matches!(err, CycleError::Persistence(_)));
    assert_eq!(store.len(), 0);
    assert_eq!(ctl.counters().snapshot().cycles_failed, 1);

    // The gate is released: the next cycle goes through.
    store.fail_appends.store(false, Ordering::SeqCst);
    assert!(ctl.trigger().await.is_ok());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn unreadable_previous_record_abandons_cycle_before_fetching() {
    let store = Arc::new(InMemoryPriceStore::default());
    store.fail_reads.store(true, Ordering::SeqCst);
    let spot = StaticSource::new("spot", Some(24.10));

    let ctl = controller(
        sources(
            spot.clone(),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let err = ctl.trigger().await.unwrap_err();

    assert!(matches!(err, CycleError::StoreRead(_)));
    assert_eq!(spot.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.len(), 0);
}

// -----------------------
// Concurrency
// -----------------------

#[tokio::test]
async fn on_demand_trigger_during_scheduled_cycle_is_busy() {
    let store = Arc::new(InMemoryPriceStore::default());
    let spot = GatedSource::new(24.10);
    let ctl = controller(
        sources(
            spot.clone(),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );
    let service = PriceService::new(Arc::clone(&ctl), store.clone());

    let scheduled = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.run_scheduled().await }
    });
    spot.entered.notified().await;

    assert!(matches!(ctl.trigger().await, Err(CycleError::Busy)));
    assert_eq!(service.trigger().await.unwrap(), TriggerOutcome::Busy);
    assert_eq!(ctl.run_scheduled().await.map(|r| r.is_ok()), None);

    spot.release.notify_one();
    let record = scheduled.await.unwrap().unwrap().unwrap();

    assert_eq!(store.all(), vec![record]);
    assert_eq!(spot.calls(), 1);

    let snap = ctl.counters().snapshot();
    assert_eq!(snap.busy_rejections, 2);
    assert_eq!(snap.scheduled_skips, 1);
    assert_eq!(snap.cycles_completed, 1);
}

#[tokio::test]
async fn queued_trigger_runs_after_in_flight_cycle() {
    let store = Arc::new(InMemoryPriceStore::default());
    let spot = GatedSource::new(24.10);
    let settings = CycleSettings {
        policy: CyclePolicy::Queue,
        ..CycleSettings::default()
    };
    let ctl = controller(
        sources(
            spot.clone(),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        settings,
    );
    assert_eq!(ctl.settings().policy, CyclePolicy::Queue);

    let first = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.trigger().await }
    });
    spot.entered.notified().await;

    let second = tokio::spawn({
        let ctl = Arc::clone(&ctl);
        async move { ctl.trigger().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());
    assert_eq!(store.len(), 0);

    spot.release.notify_one();
    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert!(second.timestamp > first.timestamp);
    assert_eq!(store.len(), 2);
    assert_eq!(ctl.counters().snapshot().busy_rejections, 0);
}

#[tokio::test]
async fn scheduler_runs_first_cycle_immediately_and_stops_on_shutdown() {
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );

    let schedule = spawn_schedule(Arc::clone(&ctl), Duration::from_secs(3600));

    for _ in 0..200 {
        if store.len() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    schedule.shutdown().await;

    assert_eq!(store.len(), 1);
    assert_eq!(ctl.counters().snapshot().cycles_completed, 1);
}

// -----------------------
// Series invariants
// -----------------------

#[tokio::test]
async fn every_record_satisfies_derivation_and_ordering() {
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(31.05)),
            StaticSource::new("conversion", None),
            StaticSource::new("secondary", Some(88.0)),
        ),
        Arc::clone(&store),
        fixed_margin(3.5),
        CycleSettings::default(),
    );

    for _ in 0..5 {
        ctl.trigger().await.unwrap();
    }

    let records = store.recent(24).await.unwrap();
    assert_eq!(records.len(), 5);

    for r in &records {
        assert_eq!(
            r.local_price,
            derive_local_price(r.spot_price_foreign, 31.3, r.conversion_rate, r.margin)
        );
    }
    assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn service_reads_latest_and_recent_oldest_first() {
    let store = Arc::new(InMemoryPriceStore::default());
    let ctl = controller(
        sources(
            StaticSource::new("spot", Some(24.10)),
            StaticSource::new("conversion", Some(86.40)),
            StaticSource::new("secondary", None),
        ),
        Arc::clone(&store),
        fixed_margin(2.0),
        CycleSettings::default(),
    );
    let service = PriceService::new(Arc::clone(&ctl), store.clone());

    assert_eq!(service.latest().await.unwrap(), None);
    assert!(service.recent(24).await.unwrap().is_empty());

    let mut appended = Vec::new();
    for _ in 0..3 {
        match service.trigger().await.unwrap() {
            TriggerOutcome::Completed(r) => appended.push(r),
            TriggerOutcome::Busy => panic!("no cycle was in flight"),
        }
    }

    assert_eq!(service.latest().await.unwrap().as_ref(), appended.last());

    let recent = service.recent(2).await.unwrap();
    assert_eq!(recent, appended[1..].to_vec());
}
