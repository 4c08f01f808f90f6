pub mod repository_sqlx;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{NewPriceRecord, PriceRecord};

pub use repository_sqlx::SqlxPriceStore;

/// Append-only time series of price records.
///
/// Implementations assign `id` and `timestamp` on append. Timestamps must be
/// strictly increasing in append order.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn append(&self, record: NewPriceRecord) -> Result<PriceRecord, StoreError>;

    async fn latest(&self) -> Result<Option<PriceRecord>, StoreError>;

    /// Up to `limit` most recent records, oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<PriceRecord>, StoreError>;
}
