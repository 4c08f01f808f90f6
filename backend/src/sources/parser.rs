use serde_json::Value;
use tracing::debug;

use crate::sources::errors::SourceError;
use crate::sources::patterns::{ExtractionStrategy, first_match, parse_number};
use crate::sources::types::RawResponse;

/// Turns one upstream response into one number.
///
/// JSON responses are read by dotted path first (`chart.result.0.meta.x`,
/// numeric segments index arrays). When that fails, or the response is not
/// JSON, the ordered pattern strategies run over the raw body.
#[derive(Clone, Debug, Default)]
pub struct Extractor {
    json_path: Option<String>,
    strategies: Vec<ExtractionStrategy>,
}

impl Extractor {
    pub fn new(json_path: Option<&str>, strategies: Vec<ExtractionStrategy>) -> Self {
        Self {
            json_path: json_path.map(str::to_owned),
            strategies,
        }
    }

    pub fn extract(&self, raw: &RawResponse) -> Result<f64, SourceError> {
        if raw.is_json() {
            if let Some(path) = &self.json_path {
                match serde_json::from_str::<Value>(&raw.body) {
                    Ok(doc) => {
                        if let Some(v) = lookup_path(&doc, path).and_then(as_number) {
                            debug!(path = %path, value = v, "structured parse matched");
                            return Ok(v);
                        }
                        debug!(path = %path, "structured path missing; trying patterns");
                    }
                    Err(e) => debug!(error = %e, "declared json but body did not parse"),
                }
            }
        }

        match first_match(&raw.body, &self.strategies) {
            Some((strategy, v)) => {
                debug!(strategy = strategy.name, value = v, "pattern parse matched");
                Ok(v)
            }
            None => Err(SourceError::Parse(format!(
                "{} strategies tried over {} bytes",
                self.strategies.len(),
                raw.body.len()
            ))),
        }
    }
}

/// Walks a dotted path through objects and arrays.
pub fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|seg| !seg.is_empty())
        .try_fold(doc, |node, seg| match node {
            Value::Object(map) => map.get(seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// JSON numbers, and numeric strings as some upstreams quote them.
pub fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    }
}
