//! Fee domain types.
//!
//! A fee is one obligation for one member in one social year. Paying it
//! produces exactly one income movement and one receipt; reopening it
//! removes both.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fee status.
///
/// Valid transitions:
/// - Pending → Overdue (sweep, once the due date has passed)
/// - Pending/Overdue → Paid (mark paid, edit, offline confirmation)
/// - Paid → Pending/Overdue (edit, reopening)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    /// Awaiting payment, not yet due.
    Pending,
    /// Settled.
    Paid,
    /// Awaiting payment past its due date.
    Overdue,
}

impl FeeStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Returns true for the two unpaid states.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Overdue)
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a fee was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash at the desk.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Card terminal.
    Card,
    /// PayPal.
    Paypal,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Paypal => "paypal",
            Self::Other => "other",
        }
    }

    /// Parses a method from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "card" => Some(Self::Card),
            "paypal" => Some(Self::Paypal),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Human-readable label used in receipts and emails.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cash => "Contanti",
            Self::BankTransfer => "Bonifico bancario",
            Self::Card => "Carta",
            Self::Paypal => "PayPal",
            Self::Other => "Altro",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Money in.
    Income,
    /// Money out.
    Expense,
}

impl MovementType {
    /// Returns the string representation of the movement type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses a movement type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A member of the association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Member ID.
    pub id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address for notifications.
    pub email: Option<String>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// "Last First", the order used on receipts and listings.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// A membership year scoping fees and movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialYear {
    /// Social year ID.
    pub id: Uuid,
    /// Display name, e.g. "2024/2025".
    pub name: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Whether this is the year new fees default to.
    pub is_current: bool,
}

impl SocialYear {
    /// Calendar year that scopes receipt numbering for this social year.
    #[must_use]
    pub fn receipt_year(&self) -> i32 {
        self.start_date.year()
    }
}

/// A membership fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Fee ID.
    pub id: Uuid,
    /// Owing member.
    pub member_id: Uuid,
    /// Social year the fee belongs to.
    pub social_year_id: Uuid,
    /// Free-text category, e.g. "Quota associativa".
    pub fee_type: String,
    /// Amount due.
    pub amount: Decimal,
    /// Due date.
    pub due_date: NaiveDate,
    /// Set exactly when status is paid.
    pub paid_date: Option<NaiveDate>,
    /// Set when paid.
    pub payment_method: Option<PaymentMethod>,
    /// `YEAR/NNNN`, set exactly when status is paid.
    pub receipt_number: Option<String>,
    /// Current status.
    pub status: FeeStatus,
    /// A bank transfer was declared and awaits confirmation.
    pub payment_pending: bool,
    /// Reference given with the declared transfer.
    pub payment_reference: Option<String>,
    /// Free notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Fee {
    /// Label used in audit entries.
    #[must_use]
    pub fn audit_label(&self) -> String {
        format!("{} {}", self.fee_type, self.amount)
    }
}

/// A recorded income or expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMovement {
    /// Movement ID.
    pub id: Uuid,
    /// Income or expense.
    pub movement_type: MovementType,
    /// Ledger category.
    pub category_id: Uuid,
    /// Description shown in the ledger.
    pub description: String,
    /// Amount.
    pub amount: Decimal,
    /// Date the money moved.
    pub paid_at: NaiveDate,
    /// Social year, if any.
    pub social_year_id: Option<Uuid>,
    /// Member, if any.
    pub member_id: Option<Uuid>,
    /// Payment method, if known.
    pub payment_method: Option<PaymentMethod>,
    /// Receipt number, for movements created from fees.
    pub receipt_number: Option<String>,
    /// Free notes.
    pub notes: Option<String>,
    /// Fee this movement was created from. Unique across movements.
    pub source_fee_id: Option<Uuid>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Longest movement description the ledger stores, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 255;

impl LedgerMovement {
    /// Description of the income movement created when a fee is paid.
    ///
    /// Cut to `MAX_DESCRIPTION_LEN` characters.
    #[must_use]
    pub fn fee_income_description(fee_type: &str, year_name: &str, member_name: &str) -> String {
        format!("{fee_type} {year_name} - {member_name}")
            .chars()
            .take(MAX_DESCRIPTION_LEN)
            .collect()
    }
}

/// Proof of payment for a paid fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Receipt ID.
    pub id: Uuid,
    /// Paid fee. Unique across receipts.
    pub fee_id: Uuid,
    /// Numbering year.
    pub year: i32,
    /// Position within the year, starting at 1.
    pub sequence: u32,
    /// Formatted `YEAR/NNNN`.
    pub receipt_number: String,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Free payment details, e.g. a bank transfer reference.
    pub payment_details: Option<String>,
    /// User who issued it.
    pub issued_by: Uuid,
    /// Issue timestamp.
    pub generated_at: DateTime<Utc>,
}

/// Input for creating a single fee.
///
/// Required fields are optional here so validation can report every
/// missing one at once.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeDraft {
    /// Owing member.
    pub member_id: Option<Uuid>,
    /// Social year.
    pub social_year_id: Option<Uuid>,
    /// Free-text category.
    #[serde(default)]
    pub fee_type: String,
    /// Amount due.
    pub amount: Option<Decimal>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Free notes.
    pub notes: Option<String>,
}

/// Input from the fee edit form.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeUpdate {
    /// Owing member.
    pub member_id: Option<Uuid>,
    /// Social year.
    pub social_year_id: Option<Uuid>,
    /// Free-text category.
    #[serde(default)]
    pub fee_type: String,
    /// Amount due.
    pub amount: Option<Decimal>,
    /// Due date.
    pub due_date: Option<NaiveDate>,
    /// Target status.
    pub status: FeeStatus,
    /// Required when moving an unpaid fee to paid.
    pub payment_method: Option<PaymentMethod>,
    /// Stored on the receipt when the edit pays the fee.
    pub payment_details: Option<String>,
    /// Free notes.
    pub notes: Option<String>,
}

/// Payment data for `mark_paid`.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    /// Payment method.
    pub method: PaymentMethod,
    /// Free payment details.
    pub details: Option<String>,
    /// Email the member a payment confirmation.
    #[serde(default)]
    pub notify: bool,
}

/// A fee after a successful payment, with its derived records.
#[derive(Debug, Clone, Serialize)]
pub struct PaidFee {
    /// The fee, now paid.
    pub fee: Fee,
    /// The income movement created from it.
    pub movement: LedgerMovement,
    /// The receipt attached to it.
    pub receipt: Receipt,
}

/// Result of a payment attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The fee was paid by this call.
    Paid(PaidFee),
    /// The fee was already paid; nothing changed.
    AlreadyPaid(Fee),
}

impl PaymentOutcome {
    /// The fee as it stands after the call.
    #[must_use]
    pub const fn fee(&self) -> &Fee {
        match self {
            Self::Paid(paid) => &paid.fee,
            Self::AlreadyPaid(fee) => fee,
        }
    }
}

/// Bulk renewal request, shared by preview and creation.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkFeeRequest {
    /// Target social year.
    pub social_year_id: Uuid,
    /// Members to bill.
    pub member_ids: Vec<Uuid>,
    /// Base amount.
    pub base_amount: Decimal,
    /// Due date for every created fee.
    pub due_date: NaiveDate,
    /// Free-text category.
    pub fee_type: String,
    /// Substitute each member's most recent earlier fee amount when present.
    #[serde(default)]
    pub use_previous_amount: bool,
    /// Signed percentage applied after substitution.
    pub percentage_adjustment: Option<Decimal>,
    /// Email each member whose fee was created.
    #[serde(default)]
    pub notify: bool,
    /// Notes copied to every created fee.
    pub notes: Option<String>,
}

/// One line of a bulk renewal preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPreviewLine {
    /// Member ID.
    pub member_id: Uuid,
    /// "Last First".
    pub member_name: String,
    /// Most recent fee amount in an earlier social year.
    pub previous_amount: Option<Decimal>,
    /// Amount the fee would be created with.
    pub amount: Decimal,
    /// The member already has a fee in the target year and would be skipped.
    pub already_has_fee: bool,
}

/// Outcome of a bulk renewal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkFeeResult {
    /// Fees created.
    pub created: u32,
    /// Members skipped because they already had a fee for the year.
    pub skipped: u32,
    /// Notifications the notifier accepted.
    pub emails_sent: u32,
    /// IDs of the created fees.
    pub fee_ids: Vec<Uuid>,
}

/// Filter for fee listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeeFilter {
    /// Restrict to one social year.
    pub social_year_id: Option<Uuid>,
    /// Restrict to one member.
    pub member_id: Option<Uuid>,
    /// Restrict to one status.
    pub status: Option<FeeStatus>,
    /// Restrict by declared-payment flag.
    pub payment_pending: Option<bool>,
}

impl FeeFilter {
    /// Returns true if the fee passes every set criterion.
    #[must_use]
    pub fn matches(&self, fee: &Fee) -> bool {
        self.social_year_id.is_none_or(|id| fee.social_year_id == id)
            && self.member_id.is_none_or(|id| fee.member_id == id)
            && self.status.is_none_or(|status| fee.status == status)
            && self
                .payment_pending
                .is_none_or(|pending| fee.payment_pending == pending)
    }
}

/// A fee with its derived records.
#[derive(Debug, Clone, Serialize)]
pub struct FeeDetail {
    /// The fee.
    pub fee: Fee,
    /// Its receipt, when paid.
    pub receipt: Option<Receipt>,
    /// Movements created from it. At most one.
    pub movements: Vec<LedgerMovement>,
}

/// A member with overdue fees in a social year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MorosoEntry {
    /// Member ID.
    pub member_id: Uuid,
    /// "Last First".
    pub member_name: String,
    /// Contact address.
    pub email: Option<String>,
    /// Number of overdue fees.
    pub overdue_fees: u64,
    /// Sum of overdue amounts.
    pub overdue_amount: Decimal,
}
