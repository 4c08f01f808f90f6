use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{AnyPool, Row};
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::model::{ActivityInfo, NewPriceRecord, PriceRecord};
use crate::store::PriceStore;

/// SQLx-backed price series.
/// Responsible only for persistence and row mapping.
#[derive(Clone)]
pub struct SqlxPriceStore {
    pool: AnyPool,
}

impl SqlxPriceStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for SqlxPriceStore {
    #[instrument(skip_all, target = "store", fields(local_price = record.local_price))]
    async fn append(&self, record: NewPriceRecord) -> Result<PriceRecord, StoreError> {
        let activity_json = record
            .activity_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut tx = self.pool.begin().await?;

        // Wall clocks can step backwards; the series must not.
        let last_us: Option<i64> =
            sqlx::query_scalar("SELECT MAX(recorded_at_us) FROM price_records")
                .fetch_one(&mut *tx)
                .await?;
        let now_us = Utc::now().timestamp_micros();
        let recorded_at_us = match last_us {
            Some(prev) if prev >= now_us => prev + 1,
            _ => now_us,
        };

        let row = sqlx::query(
            r#"
INSERT INTO price_records (
  spot_price_foreign, local_price, conversion_rate,
  secondary_instrument_price, margin, activity_info, recorded_at_us
)
VALUES (?, ?, ?, ?, ?, ?, ?)
RETURNING id;
"#,
        )
        .bind(record.spot_price_foreign)
        .bind(record.local_price)
        .bind(record.conversion_rate)
        .bind(record.secondary_instrument_price)
        .bind(record.margin)
        .bind(activity_json)
        .bind(recorded_at_us)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = row.try_get("id")?;
        tx.commit().await?;

        let timestamp = micros_to_utc(id, recorded_at_us)?;
        debug!(id, recorded_at_us, "price record appended");

        Ok(PriceRecord::from_new(id, timestamp, record))
    }

    async fn latest(&self) -> Result<Option<PriceRecord>, StoreError> {
        let row = sqlx::query(
            r#"
SELECT
  id, spot_price_foreign, local_price, conversion_rate,
  secondary_instrument_price, margin, activity_info, recorded_at_us
FROM price_records
ORDER BY recorded_at_us DESC, id DESC
LIMIT 1;
"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PriceRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
SELECT
  id, spot_price_foreign, local_price, conversion_rate,
  secondary_instrument_price, margin, activity_info, recorded_at_us
FROM price_records
ORDER BY recorded_at_us DESC, id DESC
LIMIT ?;
"#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut out = rows
            .iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        // Queried newest-first for the LIMIT; charts want oldest-first.
        out.reverse();
        Ok(out)
    }
}

/* =========================
Row mapping
========================= */

fn row_to_record(r: &sqlx::any::AnyRow) -> Result<PriceRecord, StoreError> {
    let id: i64 = r.try_get("id")?;

    let activity_info = match r.try_get::<Option<String>, _>("activity_info")? {
        Some(raw) => match serde_json::from_str::<ActivityInfo>(&raw) {
            Ok(info) => Some(info),
            Err(e) => {
                // Auxiliary signal only: a bad blob must not hide the price.
                warn!(id, error = %e, "dropping malformed activity_info");
                None
            }
        },
        None => None,
    };

    Ok(PriceRecord {
        id,
        spot_price_foreign: r.try_get("spot_price_foreign")?,
        local_price: r.try_get("local_price")?,
        conversion_rate: r.try_get("conversion_rate")?,
        secondary_instrument_price: r.try_get("secondary_instrument_price")?,
        margin: r.try_get("margin")?,
        activity_info,
        timestamp: micros_to_utc(id, r.try_get("recorded_at_us")?)?,
    })
}

fn micros_to_utc(id: i64, us: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(us).ok_or_else(|| StoreError::CorruptRow {
        id,
        reason: format!("timestamp {us}us out of range"),
    })
}
