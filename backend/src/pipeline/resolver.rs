//! Per-field fallback: fresh value, else last persisted value, else default.
//!
//! The previous record is an explicit argument, read from the store at the
//! start of the cycle, so resolution is a pure function of its inputs.

use std::fmt;

use crate::config::FieldDefaults;
use crate::error::CycleError;
use crate::model::{ActivityInfo, PriceRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    SpotPrice,
    ConversionRate,
    SecondaryPrice,
    Margin,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::SpotPrice => "spot_price_foreign",
            Field::ConversionRate => "conversion_rate",
            Field::SecondaryPrice => "secondary_instrument_price",
            Field::Margin => "margin",
        })
    }
}

/// Which fallback tier supplied a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Fresh,
    Previous,
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::Fresh => "fresh",
            Tier::Previous => "previous",
            Tier::Default => "default",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: Tier,
}

/// Validated values from the current cycle; `None` means missing or rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FreshValues {
    pub spot: Option<f64>,
    pub conversion: Option<f64>,
    pub secondary: Option<f64>,
    pub margin: Option<f64>,
    pub activity: Option<ActivityInfo>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFields {
    pub spot: Resolved<f64>,
    pub conversion: Resolved<f64>,
    pub secondary: Resolved<Option<f64>>,
    pub margin: Resolved<f64>,
    pub activity: Resolved<Option<ActivityInfo>>,
}

impl ResolvedFields {
    /// `(field, tier)` for the scalar fields, for logging and counters.
    pub fn tiers(&self) -> [(Field, Tier); 4] {
        [
            (Field::SpotPrice, self.spot.tier),
            (Field::ConversionRate, self.conversion.tier),
            (Field::SecondaryPrice, self.secondary.tier),
            (Field::Margin, self.margin.tier),
        ]
    }
}

pub fn resolve_value<T>(fresh: Option<T>, previous: Option<T>, default: T) -> Resolved<T> {
    match (fresh, previous) {
        (Some(value), _) => Resolved {
            value,
            tier: Tier::Fresh,
        },
        (None, Some(value)) => Resolved {
            value,
            tier: Tier::Previous,
        },
        (None, None) => Resolved {
            value: default,
            tier: Tier::Default,
        },
    }
}

/// A required field whose default is unusable is a configuration defect.
fn resolve_required(
    field: Field,
    fresh: Option<f64>,
    previous: Option<f64>,
    default: f64,
) -> Result<Resolved<f64>, CycleError> {
    let r = resolve_value(fresh, previous, default);
    if r.tier == Tier::Default && !r.value.is_finite() {
        return Err(CycleError::ResolutionExhausted { field });
    }
    Ok(r)
}

pub fn resolve_fields(
    fresh: FreshValues,
    previous: Option<&PriceRecord>,
    defaults: &FieldDefaults,
) -> Result<ResolvedFields, CycleError> {
    Ok(ResolvedFields {
        spot: resolve_required(
            Field::SpotPrice,
            fresh.spot,
            previous.map(|p| p.spot_price_foreign),
            defaults.spot,
        )?,
        conversion: resolve_required(
            Field::ConversionRate,
            fresh.conversion,
            previous.map(|p| p.conversion_rate),
            defaults.conversion,
        )?,
        margin: resolve_required(
            Field::Margin,
            fresh.margin,
            previous.map(|p| p.margin),
            defaults.margin,
        )?,
        // A previous record without a secondary price does not count as a
        // value: keep looking at the default.
        secondary: resolve_value(
            fresh.secondary.map(Some),
            previous
                .and_then(|p| p.secondary_instrument_price)
                .map(Some),
            defaults.secondary,
        ),
        activity: resolve_value(
            fresh.activity.map(Some),
            previous.and_then(|p| p.activity_info.clone()).map(Some),
            None,
        ),
    })
}
