use serde_json::Value;

use crate::model::{ActivityInfo, Sentiment};
use crate::sources::parser::lookup_path;
use crate::sources::types::RawResponse;

/// Where the chart endpoint keeps its intraday volume series.
pub const VOLUME_PATH: &str = "chart.result.0.indicators.quote.0.volume";

/// Derives the activity signal from a spot chart response.
///
/// Nulls in the series (illiquid minutes) are skipped. Sentiment is `High`
/// when the latest volume is above the series average.
pub fn extract_activity(raw: &RawResponse) -> Option<ActivityInfo> {
    if !raw.is_json() {
        return None;
    }

    let doc: Value = serde_json::from_str(&raw.body).ok()?;
    let volumes: Vec<f64> = lookup_path(&doc, VOLUME_PATH)?
        .as_array()?
        .iter()
        .filter_map(Value::as_f64)
        .collect();

    let last_volume = *volumes.last()?;
    let avg_volume = volumes.iter().sum::<f64>() / volumes.len() as f64;

    Some(ActivityInfo {
        last_volume,
        avg_volume,
        sentiment: if last_volume > avg_volume {
            Sentiment::High
        } else {
            Sentiment::Normal
        },
    })
}
