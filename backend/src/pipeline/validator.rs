use thiserror::Error;
use tracing::warn;

use crate::pipeline::resolver::Field;

/// Exclusive `(min, max)` plausibility range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both ends excluded; NaN and infinities never pass.
    pub fn contains(&self, v: f64) -> bool {
        v.is_finite() && self.min < v && v < self.max
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("{field} value {value} outside ({}, {})", .bounds.min, .bounds.max)]
pub struct ImplausibleValue {
    pub field: Field,
    pub value: f64,
    pub bounds: Bounds,
}

pub fn check(field: Field, value: f64, bounds: Bounds) -> Result<f64, ImplausibleValue> {
    if bounds.contains(value) {
        Ok(value)
    } else {
        Err(ImplausibleValue {
            field,
            value,
            bounds,
        })
    }
}

/// Like [`check`], but an implausible value is logged and dropped.
///
/// The rejected number only ever reaches the logs: a burst of these usually
/// means an upstream changed its page layout.
pub fn validate(field: Field, value: f64, bounds: Bounds) -> Option<f64> {
    match check(field, value, bounds) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(
                field = %e.field,
                rejected = e.value,
                min = e.bounds.min,
                max = e.bounds.max,
                "implausible value rejected"
            );
            None
        }
    }
}
