//! Accumulating input validation.
//!
//! Every check pushes onto a `Violations` list instead of returning early,
//! so callers can report all bad fields in one response.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::{FeeError, FieldError};
use super::types::{BulkFeeRequest, FeeDraft, FeeStatus, FeeUpdate, PaymentMethod};

/// Longest accepted fee type.
pub const MAX_FEE_TYPE_LEN: usize = 100;

/// Longest accepted payment reference.
pub const MAX_REFERENCE_LEN: usize = 255;

/// Largest amount a `NUMERIC(12,2)` column holds: 9 999 999 999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Largest accepted renewal percentage adjustment.
pub const MAX_PERCENTAGE_ADJUSTMENT: Decimal = Decimal::ONE_THOUSAND;

/// Collected field errors.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a violation.
    pub fn push(&mut self, field: &'static str, code: &'static str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, code, message));
    }

    /// Records `not_found` for a referenced entity that does not exist.
    pub fn require_found(&mut self, field: &'static str, found: bool) {
        if !found {
            self.push(field, "not_found", format!("{field} does not reference an existing record"));
        }
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Recorded violations.
    #[must_use]
    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    /// `Ok` when empty, otherwise `FeeError::Validation` with every entry.
    pub fn into_result(self) -> Result<(), FeeError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(FeeError::Validation(self.0))
        }
    }
}

fn check_amount(v: &mut Violations, field: &'static str, amount: Option<Decimal>) {
    match amount {
        None => v.push(field, "required", format!("{field} is required")),
        Some(a) if a <= Decimal::ZERO => {
            v.push(field, "not_positive", format!("{field} must be greater than zero"));
        }
        Some(a) if a > MAX_AMOUNT => {
            v.push(field, "too_large", format!("{field} must be at most {MAX_AMOUNT}"));
        }
        Some(a) if a.scale() > 2 && a != a.round_dp(2) => {
            v.push(field, "too_precise", format!("{field} has more than 2 decimal places"));
        }
        Some(_) => {}
    }
}

fn check_fee_type(v: &mut Violations, fee_type: &str) {
    let trimmed = fee_type.trim();
    if trimmed.is_empty() {
        v.push("fee_type", "required", "fee type is required");
    } else if trimmed.chars().count() > MAX_FEE_TYPE_LEN {
        v.push(
            "fee_type",
            "too_long",
            format!("fee type must be at most {MAX_FEE_TYPE_LEN} characters"),
        );
    }
}

fn check_required<T>(v: &mut Violations, field: &'static str, value: Option<T>) {
    if value.is_none() {
        v.push(field, "required", format!("{field} is required"));
    }
}

/// Field checks for direct fee creation. Reference existence is checked by the caller.
#[must_use]
pub fn validate_draft(draft: &FeeDraft) -> Violations {
    let mut v = Violations::new();
    check_required(&mut v, "member_id", draft.member_id);
    check_required(&mut v, "social_year_id", draft.social_year_id);
    check_fee_type(&mut v, &draft.fee_type);
    check_amount(&mut v, "amount", draft.amount);
    check_required(&mut v, "due_date", draft.due_date);
    v
}

/// Field checks for the edit form.
///
/// A payment method is required only when the edit pays an unpaid fee.
#[must_use]
pub fn validate_update(update: &FeeUpdate, current: FeeStatus) -> Violations {
    let mut v = Violations::new();
    check_required(&mut v, "member_id", update.member_id);
    check_required(&mut v, "social_year_id", update.social_year_id);
    check_fee_type(&mut v, &update.fee_type);
    check_amount(&mut v, "amount", update.amount);
    check_required(&mut v, "due_date", update.due_date);
    if update.status == FeeStatus::Paid && current != FeeStatus::Paid {
        check_required::<PaymentMethod>(&mut v, "payment_method", update.payment_method);
    }
    v
}

/// Field checks for bulk renewal.
#[must_use]
pub fn validate_bulk(request: &BulkFeeRequest) -> Violations {
    let mut v = Violations::new();
    if request.member_ids.is_empty() {
        v.push("member_ids", "required", "select at least one member");
    }
    check_fee_type(&mut v, &request.fee_type);
    check_amount(&mut v, "base_amount", Some(request.base_amount));
    if let Some(pct) = request.percentage_adjustment
        && (pct <= -Decimal::ONE_HUNDRED || pct > MAX_PERCENTAGE_ADJUSTMENT)
    {
        v.push(
            "percentage_adjustment",
            "out_of_range",
            format!(
                "percentage adjustment must be greater than -100 and at most {MAX_PERCENTAGE_ADJUSTMENT}"
            ),
        );
    }
    v
}

/// Checks a declared transfer reference.
#[must_use]
pub fn validate_reference(reference: &str) -> Violations {
    let mut v = Violations::new();
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        v.push("payment_reference", "required", "payment reference is required");
    } else if trimmed.chars().count() > MAX_REFERENCE_LEN {
        v.push(
            "payment_reference",
            "too_long",
            format!("payment reference must be at most {MAX_REFERENCE_LEN} characters"),
        );
    }
    v
}

/// Returns the end of the "expiring soon" window starting today.
#[must_use]
pub fn expiring_window_end(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(chrono::Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn codes(v: &Violations) -> Vec<(&'static str, &'static str)> {
        v.as_slice().iter().map(|f| (f.field, f.code)).collect()
    }

    #[test]
    fn test_empty_draft_reports_every_field() {
        let v = validate_draft(&FeeDraft::default());
        assert_eq!(
            codes(&v),
            vec![
                ("member_id", "required"),
                ("social_year_id", "required"),
                ("fee_type", "required"),
                ("amount", "required"),
                ("due_date", "required"),
            ]
        );
    }

    #[test]
    fn test_valid_draft() {
        let draft = FeeDraft {
            member_id: Some(Uuid::new_v4()),
            social_year_id: Some(Uuid::new_v4()),
            fee_type: "Quota associativa".into(),
            amount: Some(dec!(50.00)),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            notes: None,
        };
        assert!(validate_draft(&draft).into_result().is_ok());
    }

    #[test]
    fn test_amount_rules() {
        let mut v = Violations::new();
        check_amount(&mut v, "amount", Some(dec!(0)));
        check_amount(&mut v, "amount", Some(dec!(-5)));
        check_amount(&mut v, "amount", Some(dec!(10.005)));
        check_amount(&mut v, "amount", Some(dec!(10.500)));
        assert_eq!(
            codes(&v),
            vec![
                ("amount", "not_positive"),
                ("amount", "not_positive"),
                ("amount", "too_precise"),
            ]
        );
    }

    #[test]
    fn test_amount_upper_bound() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999.99));
        let mut v = Violations::new();
        check_amount(&mut v, "amount", Some(dec!(9999999999.99)));
        check_amount(&mut v, "amount", Some(dec!(10000000000)));
        assert_eq!(codes(&v), vec![("amount", "too_large")]);
    }

    #[test]
    fn test_update_to_paid_requires_method() {
        let update = FeeUpdate {
            member_id: Some(Uuid::new_v4()),
            social_year_id: Some(Uuid::new_v4()),
            fee_type: "Quota".into(),
            amount: Some(dec!(30)),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31),
            status: FeeStatus::Paid,
            payment_method: None,
            payment_details: None,
            notes: None,
        };
        assert_eq!(
            codes(&validate_update(&update, FeeStatus::Pending)),
            vec![("payment_method", "required")]
        );
        assert!(validate_update(&update, FeeStatus::Paid).is_empty());
    }

    #[test]
    fn test_bulk_rules() {
        let request = BulkFeeRequest {
            social_year_id: Uuid::new_v4(),
            member_ids: vec![],
            base_amount: dec!(0),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            fee_type: " ".into(),
            use_previous_amount: false,
            percentage_adjustment: Some(dec!(-100)),
            notify: false,
            notes: None,
        };
        assert_eq!(
            codes(&validate_bulk(&request)),
            vec![
                ("member_ids", "required"),
                ("fee_type", "required"),
                ("base_amount", "not_positive"),
                ("percentage_adjustment", "out_of_range"),
            ]
        );
    }

    #[test]
    fn test_bulk_caps_percentage_and_base() {
        let mut request = BulkFeeRequest {
            social_year_id: Uuid::new_v4(),
            member_ids: vec![Uuid::new_v4()],
            base_amount: dec!(100),
            due_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            fee_type: "Quota".into(),
            use_previous_amount: false,
            percentage_adjustment: Some(MAX_PERCENTAGE_ADJUSTMENT),
            notify: false,
            notes: None,
        };
        assert!(validate_bulk(&request).is_empty());

        request.percentage_adjustment = Some(dec!(1000000000000000000000000000));
        request.base_amount = dec!(99999999999);
        assert_eq!(
            codes(&validate_bulk(&request)),
            vec![
                ("base_amount", "too_large"),
                ("percentage_adjustment", "out_of_range"),
            ]
        );
    }

    #[test]
    fn test_reference_rules() {
        assert!(validate_reference("CRO 1234").is_empty());
        assert_eq!(
            codes(&validate_reference("   ")),
            vec![("payment_reference", "required")]
        );
        assert_eq!(
            codes(&validate_reference(&"x".repeat(300))),
            vec![("payment_reference", "too_long")]
        );
    }

    #[test]
    fn test_expiring_window_end() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            expiring_window_end(today, 30),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        assert_eq!(expiring_window_end(today, 0), today);
    }
}
