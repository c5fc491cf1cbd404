//! Renewal amount rule shared by bulk preview and bulk creation.

use rust_decimal::Decimal;

use super::error::{FeeError, FieldError};

/// Computes the amount of a renewed fee.
///
/// Order: base amount, then previous-year substitution when requested and
/// available, then the signed percentage adjustment, then rounding to
/// cents (banker's rounding).
///
/// # Errors
///
/// Returns `FeeError::Validation` on `percentage_adjustment` when the
/// adjustment overflows `Decimal`.
pub fn renewal_amount(
    base: Decimal,
    previous: Option<Decimal>,
    use_previous: bool,
    percentage: Option<Decimal>,
) -> Result<Decimal, FeeError> {
    let start = match previous {
        Some(prev) if use_previous => prev,
        _ => base,
    };

    let adjusted = match percentage {
        Some(pct) if !pct.is_zero() => start
            .checked_mul(pct)
            .and_then(|delta| delta.checked_div(Decimal::ONE_HUNDRED))
            .and_then(|delta| start.checked_add(delta))
            .ok_or_else(overflow)?,
        _ => start,
    };

    Ok(adjusted.round_dp(2))
}

fn overflow() -> FeeError {
    FeeError::Validation(vec![FieldError::new(
        "percentage_adjustment",
        "overflow",
        "percentage adjustment produces an amount out of range",
    )])
}
