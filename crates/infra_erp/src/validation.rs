//! Local pre-submission checks
//!
//! Everything the ERP would reject for format reasons is caught here, before
//! a token is requested. Each check fails with a field-specific
//! [`ErpError::Validation`].

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{checked_mul, is_guid, round_half_up};

use crate::error::ErpError;
use crate::model::Invoice;

/// Largest accepted difference between `sum` and `amount × price`
pub const SUM_TOLERANCE: Decimal = dec!(0.01);

fn require_guid(field: &str, value: &str) -> Result<(), ErpError> {
    if is_guid(value) {
        Ok(())
    } else {
        Err(ErpError::validation(format!("Invalid {} format: {}", field, value)))
    }
}

/// Validates an invoice against the import rules
///
/// `today` anchors the date check: `date_incoming` may be at most one day
/// ahead.
pub fn validate_invoice(invoice: &Invoice, today: NaiveDate) -> Result<(), ErpError> {
    require_guid("supplier_id", &invoice.supplier_id)?;
    require_guid("default_store_id", &invoice.default_store_id)?;
    if let Some(conception_id) = &invoice.conception_id {
        require_guid("conception_id", conception_id)?;
    }

    if invoice.items.is_empty() {
        return Err(ErpError::validation("Invoice must contain at least one item"));
    }

    let max_date = today + Duration::days(1);
    if let Some(date) = invoice.date_incoming {
        if date > max_date {
            return Err(ErpError::validation(format!(
                "date_incoming ({}) cannot be later than {}",
                date, max_date
            )));
        }
    }

    for item in &invoice.items {
        require_guid("product_id", &item.product_id)?;
        if let Some(store_id) = &item.store_id {
            require_guid("store_id", store_id)?;
        }

        if item.amount <= Decimal::ZERO {
            return Err(ErpError::validation(format!("Item {}: amount must be positive", item.num)));
        }
        if item.price < Decimal::ZERO {
            return Err(ErpError::validation(format!("Item {}: price cannot be negative", item.num)));
        }
        if item.sum < Decimal::ZERO {
            return Err(ErpError::validation(format!("Item {}: sum cannot be negative", item.num)));
        }

        let product = checked_mul(item.amount, item.price).map_err(|err| {
            ErpError::validation(format!("Item {}: price*amount cannot be computed: {}", item.num, err))
        })?;
        let expected = round_half_up(product, 2);
        let diff = expected
            .checked_sub(item.sum)
            .map(|d| d.abs())
            .ok_or_else(|| ErpError::validation(format!("Item {}: sum is out of range", item.num)))?;
        if diff > SUM_TOLERANCE {
            return Err(ErpError::validation(format!(
                "Item {}: sum ({}) does not match price*amount ({}*{}={}), diff={}",
                item.num, item.sum, item.price, item.amount, expected, diff
            )));
        }
    }

    Ok(())
}
