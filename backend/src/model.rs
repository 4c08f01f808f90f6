use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse trading-activity signal derived from the spot feed's volume series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    High,
    Normal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInfo {
    pub last_volume: f64,
    pub avg_volume: f64,
    pub sentiment: Sentiment,
}

/// A fully resolved record, ready to be appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPriceRecord {
    /// USD per troy ounce.
    pub spot_price_foreign: f64,

    /// INR per gram; always derived from the three fields of this record.
    pub local_price: f64,

    /// INR per USD.
    pub conversion_rate: f64,

    pub secondary_instrument_price: Option<f64>,

    pub margin: f64,

    pub activity_info: Option<ActivityInfo>,
}

/// One point of the published time series. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRecord {
    pub id: i64,
    pub spot_price_foreign: f64,
    pub local_price: f64,
    pub conversion_rate: f64,
    pub secondary_instrument_price: Option<f64>,
    pub margin: f64,
    pub activity_info: Option<ActivityInfo>,

    /// Assigned by the store; strictly increasing in append order.
    pub timestamp: DateTime<Utc>,
}

impl PriceRecord {
    pub fn from_new(id: i64, timestamp: DateTime<Utc>, r: NewPriceRecord) -> Self {
        Self {
            id,
            spot_price_foreign: r.spot_price_foreign,
            local_price: r.local_price,
            conversion_rate: r.conversion_rate,
            secondary_instrument_price: r.secondary_instrument_price,
            margin: r.margin,
            activity_info: r.activity_info,
            timestamp,
        }
    }
}
