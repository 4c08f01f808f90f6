use std::sync::Arc;

use crate::error::{CycleError, StoreError};
use crate::model::PriceRecord;
use crate::pipeline::IngestionController;
use crate::store::PriceStore;

/// What an on-demand trigger did.
#[derive(Clone, Debug, PartialEq)]
pub enum TriggerOutcome {
    /// A cycle ran; this is the record it appended (now the latest).
    Completed(PriceRecord),
    /// Another cycle was in flight and the trigger was coalesced into it.
    Busy,
}

/// Read and trigger surface handed to the HTTP / UI layer.
#[derive(Clone)]
pub struct PriceService {
    controller: Arc<IngestionController>,
    store: Arc<dyn PriceStore>,
}

impl PriceService {
    pub fn new(controller: Arc<IngestionController>, store: Arc<dyn PriceStore>) -> Self {
        Self { controller, store }
    }

    pub async fn latest(&self) -> Result<Option<PriceRecord>, StoreError> {
        self.store.latest().await
    }

    /// Oldest first, at most `limit` records.
    pub async fn recent(&self, limit: usize) -> Result<Vec<PriceRecord>, StoreError> {
        self.store.recent(limit).await
    }

    pub async fn trigger(&self) -> Result<TriggerOutcome, CycleError> {
        match self.controller.trigger().await {
            Ok(record) => Ok(TriggerOutcome::Completed(record)),
            Err(CycleError::Busy) => Ok(TriggerOutcome::Busy),
            Err(e) => Err(e),
        }
    }
}
