use std::time::Duration;

use async_trait::async_trait;

/// Body and metadata of one upstream response, kept for the cycle only.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    /// True when the upstream declared a machine-readable payload.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
    }
}

/// Outcome of one adapter invocation. `value` is absent on any failure.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceResult {
    pub value: Option<f64>,
    pub raw: Option<RawResponse>,
}

impl SourceResult {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn value(v: f64) -> Self {
        Self {
            value: Some(v),
            raw: None,
        }
    }
}

/// One upstream endpoint that yields a single numeric field.
///
/// `fetch` must not fail: every problem is logged and reported as an absent
/// value. Callers additionally bound each call by `timeout()`.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration;

    async fn fetch(&self) -> SourceResult;
}
