use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;

/// Operator-supplied additive margin, read once per cycle.
///
/// An error here never blocks a cycle: the resolver falls back to the
/// previous record's margin, then to the configured default.
#[async_trait]
pub trait MarginSource: Send + Sync {
    async fn current_margin(&self) -> anyhow::Result<f64>;
}

/// Margin fixed at startup.
#[derive(Clone, Copy, Debug)]
pub struct FixedMargin(pub f64);

#[async_trait]
impl MarginSource for FixedMargin {
    async fn current_margin(&self) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

/// Margin kept in a file as a bare number, so it can change without a restart.
#[derive(Clone, Debug)]
pub struct MarginFile {
    path: PathBuf,
}

impl MarginFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MarginSource for MarginFile {
    async fn current_margin(&self) -> anyhow::Result<f64> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading margin file {}", self.path.display()))?;

        raw.trim()
            .parse::<f64>()
            .with_context(|| format!("margin file {} holds {:?}", self.path.display(), raw.trim()))
    }
}
