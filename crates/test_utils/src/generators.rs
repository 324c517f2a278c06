//! Property-Based Test Generators
//!
//! Provides proptest strategies for invoice data that keeps the
//! arithmetic invariants of a correct line.

use core_kernel::round_half_up;
use domain_invoice::InvoiceLine;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for ERP-shaped GUIDs
pub fn guid_strategy() -> impl Strategy<Value = String> {
    any::<u128>().prop_map(|n| uuid::Uuid::from_u128(n).to_string())
}

/// Strategy for quantities with up to three decimals (0.001 to 999.999)
pub fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 3).normalize())
}

/// Strategy for unit prices in kopecks (0.01 to 99 999.99)
pub fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for lines whose amount is exactly `quantity × price`
pub fn exact_line_strategy() -> impl Strategy<Value = InvoiceLine> {
    (quantity_strategy(), price_strategy()).prop_map(|(quantity, price)| {
        InvoiceLine::new(1, "Товар", quantity, "кг", price, quantity * price)
    })
}

/// Strategy for lines whose amount is `quantity × price` rounded to kopecks
pub fn rounded_line_strategy() -> impl Strategy<Value = InvoiceLine> {
    (quantity_strategy(), price_strategy()).prop_map(|(quantity, price)| {
        InvoiceLine::new(1, "Товар", quantity, "кг", price, round_half_up(quantity * price, 2))
    })
}
