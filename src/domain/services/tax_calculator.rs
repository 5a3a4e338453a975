use crate::domain::entities::jurisdiction::JurisdictionRate;
use crate::domain::entities::order::TaxBreakdown;
use crate::domain::value_objects::money::{round2, Money};

/// Compute tax and total for a subtotal at the jurisdiction's composite rate.
///
/// Tax and total are each rounded from unrounded values: the total is
/// `round2(subtotal + subtotal * rate)`, not `subtotal + round2(tax)`. With a
/// cent-precision subtotal the two agree, so `total == subtotal + tax` holds.
pub fn calculate(subtotal: Money, jurisdiction: &JurisdictionRate) -> TaxBreakdown {
    let subtotal = subtotal.value();
    let raw_tax = subtotal * jurisdiction.composite_rate;

    TaxBreakdown {
        subtotal,
        composite_rate: jurisdiction.composite_rate,
        tax_amount: round2(raw_tax),
        total_amount: round2(subtotal + raw_tax),
    }
}
