//! Order totals using decimal arithmetic.
//!
//! Totals are never stored; they are recomputed from the current item set so
//! that a price change in the catalog is reflected in an open basket.

use rust_decimal::Decimal;

use super::quantity::Quantity;

/// Price of one line: `quantity × unit price`.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: Quantity) -> Decimal {
    unit_price * Decimal::from(quantity.get())
}

/// Sum of `quantity × unit price` over all lines.
#[must_use]
pub fn total_sum<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, Quantity)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| line_total(price, quantity))
        .sum()
}
