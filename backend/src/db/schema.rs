use anyhow::Context;
use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Price time series. `recorded_at_us` is microseconds since the epoch.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS price_records (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  spot_price_foreign REAL NOT NULL,
  local_price REAL NOT NULL,
  conversion_rate REAL NOT NULL,
  secondary_instrument_price REAL,
  margin REAL NOT NULL,
  activity_info TEXT,
  recorded_at_us BIGINT NOT NULL
);
"#,
    )
    .execute(pool)
    .await
    .context("create price_records")?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_price_records_recorded_at ON price_records(recorded_at_us);"#,
    )
    .execute(pool)
    .await
    .context("create price_records index")?;

    Ok(())
}
