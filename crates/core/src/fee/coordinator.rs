//! Fee ledger coordinator.
//!
//! Every path that changes whether a fee is paid goes through this type, so
//! the fee row, its income movement and its receipt change together inside
//! one store transaction.

use std::sync::Arc;

use rust_decimal::Decimal;
use sodalis_shared::OutgoingEmail;
use sodalis_shared::types::{PageRequest, PageResponse};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::amount::renewal_amount;
use super::audit::{AuditEntry, AuditLog};
use super::error::{FeeError, FieldError};
use super::notify::{Notifier, new_fee_message, payment_received_message};
use super::receipt::ReceiptNumber;
use super::store::{FeeStore, FeeTransaction};
use super::transition::{TransitionPlan, plan};
use super::types::{
    BulkFeeRequest, BulkFeeResult, BulkPreviewLine, Fee, FeeDetail, FeeDraft, FeeFilter,
    FeeStatus, FeeUpdate, LedgerMovement, Member, MovementType, PaidFee, PaymentInput,
    PaymentMethod, PaymentOutcome, Receipt,
};
use super::validation::{
    MAX_AMOUNT, Violations, validate_bulk, validate_draft, validate_reference, validate_update,
};
use crate::auth::Actor;
use crate::clock::Clock;

/// Coordinates fees, ledger movements and receipts.
pub struct FeeLedgerCoordinator<S, N, A> {
    pub(crate) store: Arc<S>,
    notifier: Arc<N>,
    audit: Arc<A>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl<S, N, A> Clone for FeeLedgerCoordinator<S, N, A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            audit: Arc::clone(&self.audit),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Unwraps a field that validation already proved present.
fn present<T>(value: Option<T>, field: &'static str) -> Result<T, FeeError> {
    value.ok_or_else(|| {
        FeeError::Validation(vec![FieldError::new(
            field,
            "required",
            format!("{field} is required"),
        )])
    })
}

impl<S, N, A> FeeLedgerCoordinator<S, N, A>
where
    S: FeeStore,
    N: Notifier,
    A: AuditLog,
{
    /// Creates a coordinator.
    #[must_use]
    pub fn new(store: Arc<S>, notifier: Arc<N>, audit: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            audit,
            clock,
        }
    }

    /// Creates a pending fee from direct entry.
    pub async fn create_fee(
        &self,
        actor: &Actor,
        draft: FeeDraft,
        notify: bool,
    ) -> Result<Fee, FeeError> {
        let mut violations = validate_draft(&draft);
        let mut tx = self.store.begin().await?;

        let member = match draft.member_id {
            Some(id) => {
                let member = tx.find_member(id).await?;
                violations.require_found("member_id", member.is_some());
                member
            }
            None => None,
        };
        let year = match draft.social_year_id {
            Some(id) => {
                let year = tx.find_social_year(id).await?;
                violations.require_found("social_year_id", year.is_some());
                year
            }
            None => None,
        };
        violations.into_result()?;

        let member = present(member, "member_id")?;
        let year = present(year, "social_year_id")?;
        let now = self.clock.now();
        let fee = Fee {
            id: Uuid::now_v7(),
            member_id: member.id,
            social_year_id: year.id,
            fee_type: draft.fee_type.trim().to_string(),
            amount: present(draft.amount, "amount")?,
            due_date: present(draft.due_date, "due_date")?,
            paid_date: None,
            payment_method: None,
            receipt_number: None,
            status: FeeStatus::Pending,
            payment_pending: false,
            payment_reference: None,
            notes: draft.notes,
            created_at: now,
            updated_at: now,
        };
        tx.insert_fee(&fee).await?;
        tx.commit().await?;

        info!(fee_id = %fee.id, member_id = %fee.member_id, amount = %fee.amount, "Fee created");
        self.audit(AuditEntry::fee_created(actor.user_id, &fee)).await;
        if notify {
            self.notify(new_fee_message(&member, &fee, &year)).await;
        }
        Ok(fee)
    }

    /// Marks a fee paid.
    ///
    /// An already paid fee yields `PaymentOutcome::AlreadyPaid` and nothing
    /// is written.
    pub async fn mark_paid(
        &self,
        actor: &Actor,
        fee_id: Uuid,
        payment: PaymentInput,
    ) -> Result<PaymentOutcome, FeeError> {
        let mut tx = self.store.begin().await?;
        let fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;

        if fee.status == FeeStatus::Paid {
            tx.rollback().await?;
            debug!(fee_id = %fee_id, "Fee already paid, nothing to do");
            return Ok(PaymentOutcome::AlreadyPaid(fee));
        }

        let old = fee.clone();
        let (paid, member) = self
            .settle(&mut tx, actor, fee, payment.method, payment.details)
            .await?;
        tx.commit().await?;

        info!(
            fee_id = %fee_id,
            receipt = %paid.receipt.receipt_number,
            method = %payment.method,
            "Fee marked paid"
        );
        self.audit(AuditEntry::fee_updated(actor.user_id, &old, &paid.fee))
            .await;
        if payment.notify {
            self.notify(payment_received_message(&member, &paid.fee, &paid.receipt))
                .await;
        }
        Ok(PaymentOutcome::Paid(paid))
    }

    /// Applies the fee edit form.
    ///
    /// Unpaid to paid runs the same primitive as `mark_paid`; paid to unpaid
    /// deletes the movement and the receipt; anything else is a field update.
    pub async fn set_status(
        &self,
        actor: &Actor,
        fee_id: Uuid,
        update: FeeUpdate,
    ) -> Result<Fee, FeeError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;

        let mut violations = validate_update(&update, current.status);
        if let Some(id) = update.member_id {
            let found = tx.find_member(id).await?.is_some();
            violations.require_found("member_id", found);
        }
        if let Some(id) = update.social_year_id {
            let found = tx.find_social_year(id).await?.is_some();
            violations.require_found("social_year_id", found);
        }
        violations.into_result()?;

        let mut next = current.clone();
        next.member_id = present(update.member_id, "member_id")?;
        next.social_year_id = present(update.social_year_id, "social_year_id")?;
        next.fee_type = update.fee_type.trim().to_string();
        next.amount = present(update.amount, "amount")?;
        next.due_date = present(update.due_date, "due_date")?;
        next.notes = update.notes;
        next.updated_at = self.clock.now();

        let transition = plan(current.status, update.status);
        let saved = match transition {
            TransitionPlan::Plain => {
                next.status = update.status;
                tx.update_fee(&next).await?;
                next
            }
            TransitionPlan::Pay => {
                let method = present(update.payment_method, "payment_method")?;
                let (paid, _) = self
                    .settle(&mut tx, actor, next, method, update.payment_details)
                    .await?;
                paid.fee
            }
            TransitionPlan::Reopen => {
                let movements = tx.delete_movements_for_fee(fee_id).await?;
                let receipts = tx.delete_receipt_for_fee(fee_id).await?;
                next.status = update.status;
                next.paid_date = None;
                next.payment_method = None;
                next.receipt_number = None;
                tx.update_fee(&next).await?;
                debug!(fee_id = %fee_id, movements, receipts, "Reopened fee, payment records removed");
                next
            }
        };
        tx.commit().await?;

        info!(
            fee_id = %fee_id,
            from = %current.status,
            to = %saved.status,
            ?transition,
            "Fee updated"
        );
        self.audit(AuditEntry::fee_updated(actor.user_id, &current, &saved))
            .await;
        Ok(saved)
    }

    /// Records a member's declared bank transfer, awaiting admin review.
    pub async fn declare_offline_payment(
        &self,
        actor: &Actor,
        fee_id: Uuid,
        reference: &str,
    ) -> Result<Fee, FeeError> {
        validate_reference(reference).into_result()?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;
        if current.status == FeeStatus::Paid {
            return Err(FeeError::AlreadyPaid(fee_id));
        }

        let mut next = current.clone();
        next.payment_pending = true;
        next.payment_reference = Some(reference.trim().to_string());
        next.updated_at = self.clock.now();
        tx.update_fee(&next).await?;
        tx.commit().await?;

        info!(fee_id = %fee_id, "Offline payment declared");
        self.audit(AuditEntry::fee_updated(actor.user_id, &current, &next))
            .await;
        Ok(next)
    }

    /// Confirms a declared bank transfer and pays the fee. Admin only.
    ///
    /// The declared reference becomes the receipt's payment details and the
    /// member is notified.
    pub async fn confirm_offline_payment(
        &self,
        actor: &Actor,
        fee_id: Uuid,
    ) -> Result<PaymentOutcome, FeeError> {
        actor.require_admin("confirm offline payments")?;

        let mut tx = self.store.begin().await?;
        let fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;
        if fee.status == FeeStatus::Paid {
            tx.rollback().await?;
            return Ok(PaymentOutcome::AlreadyPaid(fee));
        }
        if !fee.payment_pending {
            return Err(FeeError::NoDeclaredPayment(fee_id));
        }

        let old = fee.clone();
        let details = fee.payment_reference.clone();
        let (paid, member) = self
            .settle(&mut tx, actor, fee, PaymentMethod::BankTransfer, details)
            .await?;
        tx.commit().await?;

        info!(fee_id = %fee_id, receipt = %paid.receipt.receipt_number, "Offline payment confirmed");
        self.audit(AuditEntry::fee_updated(actor.user_id, &old, &paid.fee))
            .await;
        self.notify(payment_received_message(&member, &paid.fee, &paid.receipt))
            .await;
        Ok(PaymentOutcome::Paid(paid))
    }

    /// Rejects a declared bank transfer. Status is untouched. Admin only.
    pub async fn reject_offline_payment(
        &self,
        actor: &Actor,
        fee_id: Uuid,
    ) -> Result<Fee, FeeError> {
        actor.require_admin("reject offline payments")?;

        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;
        if !current.payment_pending {
            return Err(FeeError::NoDeclaredPayment(fee_id));
        }

        let mut next = current.clone();
        next.payment_pending = false;
        next.payment_reference = None;
        next.updated_at = self.clock.now();
        tx.update_fee(&next).await?;
        tx.commit().await?;

        info!(fee_id = %fee_id, "Offline payment rejected");
        self.audit(AuditEntry::fee_updated(actor.user_id, &current, &next))
            .await;
        Ok(next)
    }

    /// Deletes a fee, with its movement and receipt when paid. Admin only.
    pub async fn delete_fee(&self, actor: &Actor, fee_id: Uuid) -> Result<(), FeeError> {
        actor.require_admin("delete fees")?;

        let mut tx = self.store.begin().await?;
        let fee = tx
            .lock_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;
        if fee.status == FeeStatus::Paid {
            tx.delete_movements_for_fee(fee_id).await?;
            tx.delete_receipt_for_fee(fee_id).await?;
        }
        tx.delete_fee(fee_id).await?;
        tx.commit().await?;

        info!(fee_id = %fee_id, status = %fee.status, "Fee deleted");
        self.audit(AuditEntry::fee_deleted(actor.user_id, &fee)).await;
        Ok(())
    }

    /// Computes what `bulk_create_fees` would do, writing nothing.
    pub async fn preview_bulk(
        &self,
        request: &BulkFeeRequest,
    ) -> Result<Vec<BulkPreviewLine>, FeeError> {
        let mut violations = validate_bulk(request);
        let mut tx = self.store.begin().await?;
        let year = tx.find_social_year(request.social_year_id).await?;
        violations.require_found("social_year_id", year.is_some());
        let members = Self::load_members(&mut tx, &request.member_ids, &mut violations).await?;
        violations.into_result()?;
        let year = year.ok_or(FeeError::SocialYearNotFound(request.social_year_id))?;

        let mut lines = Vec::with_capacity(members.len());
        for member in members {
            let already_has_fee = tx.member_has_fee(member.id, year.id).await?;
            let previous_amount = tx.previous_fee_amount(member.id, year.start_date).await?;
            let amount = renewal_amount(
                request.base_amount,
                previous_amount,
                request.use_previous_amount,
                request.percentage_adjustment,
            )?;
            lines.push(BulkPreviewLine {
                member_id: member.id,
                member_name: member.display_name(),
                previous_amount,
                amount,
                already_has_fee,
            });
        }
        tx.rollback().await?;
        Ok(lines)
    }

    /// Creates one pending fee per member that has none in the target year.
    ///
    /// The social year row is locked for the whole batch, so overlapping
    /// renewals of the same year run one after the other.
    pub async fn bulk_create_fees(
        &self,
        actor: &Actor,
        request: BulkFeeRequest,
    ) -> Result<BulkFeeResult, FeeError> {
        let mut violations = validate_bulk(&request);
        let mut tx = self.store.begin().await?;
        let year = tx.lock_social_year(request.social_year_id).await?;
        violations.require_found("social_year_id", year.is_some());
        let members = Self::load_members(&mut tx, &request.member_ids, &mut violations).await?;
        violations.into_result()?;
        let year = year.ok_or(FeeError::SocialYearNotFound(request.social_year_id))?;

        let now = self.clock.now();
        let fee_type = request.fee_type.trim().to_string();
        let mut result = BulkFeeResult::default();
        let mut created: Vec<(Member, Fee)> = Vec::new();

        for member in members {
            if tx.member_has_fee(member.id, year.id).await? {
                result.skipped += 1;
                continue;
            }

            let previous = if request.use_previous_amount {
                tx.previous_fee_amount(member.id, year.start_date).await?
            } else {
                None
            };
            let amount = renewal_amount(
                request.base_amount,
                previous,
                request.use_previous_amount,
                request.percentage_adjustment,
            )?;
            if amount <= Decimal::ZERO {
                return Err(FeeError::Validation(vec![FieldError::new(
                    "percentage_adjustment",
                    "not_positive",
                    format!("computed amount for member {} is not positive", member.id),
                )]));
            }
            if amount > MAX_AMOUNT {
                return Err(FeeError::Validation(vec![FieldError::new(
                    "percentage_adjustment",
                    "too_large",
                    format!("computed amount for member {} exceeds {MAX_AMOUNT}", member.id),
                )]));
            }

            let fee = Fee {
                id: Uuid::now_v7(),
                member_id: member.id,
                social_year_id: year.id,
                fee_type: fee_type.clone(),
                amount,
                due_date: request.due_date,
                paid_date: None,
                payment_method: None,
                receipt_number: None,
                status: FeeStatus::Pending,
                payment_pending: false,
                payment_reference: None,
                notes: request.notes.clone(),
                created_at: now,
                updated_at: now,
            };
            tx.insert_fee(&fee).await?;
            result.created += 1;
            result.fee_ids.push(fee.id);
            created.push((member, fee));
        }
        tx.commit().await?;

        info!(
            social_year_id = %year.id,
            created = result.created,
            skipped = result.skipped,
            "Bulk renewal completed"
        );

        for (_, fee) in &created {
            self.audit(AuditEntry::fee_created(actor.user_id, fee)).await;
        }
        if request.notify {
            for (member, fee) in &created {
                if self.notify(new_fee_message(member, fee, &year)).await {
                    result.emails_sent += 1;
                }
            }
        }
        Ok(result)
    }

    /// Moves every pending fee past its due date to overdue. Idempotent.
    pub async fn update_overdue_statuses(&self) -> Result<u64, FeeError> {
        let today = self.clock.today();
        let changed = self.store.mark_overdue(today, self.clock.now()).await?;
        if changed > 0 {
            info!(changed, %today, "Fees marked overdue");
        }
        Ok(changed)
    }

    /// A fee with its receipt and movements.
    pub async fn get_fee(&self, fee_id: Uuid) -> Result<FeeDetail, FeeError> {
        let fee = self
            .store
            .find_fee(fee_id)
            .await?
            .ok_or(FeeError::FeeNotFound(fee_id))?;
        let receipt = self.store.find_receipt(fee_id).await?;
        let movements = self.store.movements_for_fee(fee_id).await?;
        Ok(FeeDetail {
            fee,
            receipt,
            movements,
        })
    }

    /// The receipt of a paid fee.
    pub async fn get_receipt(&self, fee_id: Uuid) -> Result<Option<Receipt>, FeeError> {
        self.store.find_receipt(fee_id).await
    }

    /// Lists fees, one page at a time.
    pub async fn list_fees(
        &self,
        filter: &FeeFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<Fee>, FeeError> {
        let (fees, total) = self
            .store
            .list_fees(filter, page.offset(), page.limit())
            .await?;
        Ok(PageResponse::new(fees, page, total))
    }

    /// Allocates the receipt, flips the fee to paid and creates its movement.
    async fn settle(
        &self,
        tx: &mut S::Tx,
        actor: &Actor,
        mut fee: Fee,
        method: PaymentMethod,
        details: Option<String>,
    ) -> Result<(PaidFee, Member), FeeError> {
        let year = tx
            .find_social_year(fee.social_year_id)
            .await?
            .ok_or(FeeError::SocialYearNotFound(fee.social_year_id))?;
        let member = tx
            .find_member(fee.member_id)
            .await?
            .ok_or(FeeError::MemberNotFound(fee.member_id))?;
        let today = self.clock.today();
        let now = self.clock.now();

        // An existing receipt is reused, never re-issued.
        let receipt = match tx.receipt_for_fee(fee.id).await? {
            Some(existing) => existing,
            None => {
                let receipt_year = year.receipt_year();
                let sequence = tx.next_receipt_sequence(receipt_year).await?;
                let receipt = Receipt {
                    id: Uuid::now_v7(),
                    fee_id: fee.id,
                    year: receipt_year,
                    sequence,
                    receipt_number: ReceiptNumber::new(receipt_year, sequence).to_string(),
                    payment_method: method,
                    payment_details: details,
                    issued_by: actor.user_id,
                    generated_at: now,
                };
                tx.insert_receipt(&receipt).await?;
                receipt
            }
        };

        fee.status = FeeStatus::Paid;
        fee.paid_date = Some(today);
        fee.payment_method = Some(method);
        fee.receipt_number = Some(receipt.receipt_number.clone());
        fee.payment_pending = false;
        fee.updated_at = now;
        tx.update_fee(&fee).await?;

        let movement = LedgerMovement {
            id: Uuid::now_v7(),
            movement_type: MovementType::Income,
            category_id: tx.fee_income_category().await?,
            description: LedgerMovement::fee_income_description(
                &fee.fee_type,
                &year.name,
                &member.display_name(),
            ),
            amount: fee.amount,
            paid_at: today,
            social_year_id: Some(fee.social_year_id),
            member_id: Some(fee.member_id),
            payment_method: Some(method),
            receipt_number: Some(receipt.receipt_number.clone()),
            notes: fee.notes.clone(),
            source_fee_id: Some(fee.id),
            created_at: now,
        };
        tx.insert_movement(&movement).await?;

        Ok((
            PaidFee {
                fee,
                movement,
                receipt,
            },
            member,
        ))
    }

    async fn load_members(
        tx: &mut S::Tx,
        ids: &[Uuid],
        violations: &mut Violations,
    ) -> Result<Vec<Member>, FeeError> {
        let mut members = Vec::with_capacity(ids.len());
        let mut missing = 0usize;
        for id in ids {
            match tx.find_member(*id).await? {
                Some(member) => members.push(member),
                None => missing += 1,
            }
        }
        if missing > 0 {
            violations.push(
                "member_ids",
                "not_found",
                format!("{missing} selected member(s) do not exist"),
            );
        }
        Ok(members)
    }

    async fn audit(&self, entry: AuditEntry) {
        let entity_id = entry.entity_id;
        let action = entry.action;
        if let Err(e) = self.audit.record(entry).await {
            warn!(
                entity_id = %entity_id,
                action = action.as_str(),
                error = %e,
                "Audit write failed, change kept"
            );
        }
    }

    async fn notify(&self, message: Option<OutgoingEmail>) -> bool {
        let Some(message) = message else {
            return false;
        };
        let to = message.to.clone();
        let accepted = self.notifier.queue_or_send(message).await;
        if !accepted {
            debug!(to = %to, "Notification not queued");
        }
        accepted
    }
}
