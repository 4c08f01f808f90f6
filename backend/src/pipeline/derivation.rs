use crate::model::NewPriceRecord;
use crate::pipeline::resolver::ResolvedFields;

/// `(spot / unit_conversion_constant) * conversion_rate + margin`
///
/// With the defaults: USD/oz -> USD/g -> INR/g, plus the operator margin.
pub fn derive_local_price(
    spot_price_foreign: f64,
    unit_conversion_constant: f64,
    conversion_rate: f64,
    margin: f64,
) -> f64 {
    (spot_price_foreign / unit_conversion_constant) * conversion_rate + margin
}

/// Builds the record to append. `local_price` is always computed here from
/// the resolved inputs of this same record.
pub fn build_record(resolved: ResolvedFields, unit_conversion_constant: f64) -> NewPriceRecord {
    let local_price = derive_local_price(
        resolved.spot.value,
        unit_conversion_constant,
        resolved.conversion.value,
        resolved.margin.value,
    );

    NewPriceRecord {
        spot_price_foreign: resolved.spot.value,
        local_price,
        conversion_rate: resolved.conversion.value,
        secondary_instrument_price: resolved.secondary.value,
        margin: resolved.margin.value,
        activity_info: resolved.activity.value,
    }
}
