//! Property-based tests for FeeLedgerCoordinator.
//!
//! Random sequences of operations run against the in-memory store; after
//! every step the fee, movement and receipt tables must agree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::memory::{MemoryAudit, MemoryState, MemoryStore, RecordingNotifier};
use super::tests::{admin, date};
use super::*;
use crate::clock::FixedClock;

type PropCoordinator = FeeLedgerCoordinator<MemoryStore, RecordingNotifier, MemoryAudit>;

#[derive(Debug, Clone)]
enum Op {
    MarkPaid(usize),
    EditToPaid(usize),
    Reopen(usize, FeeStatus),
    Declare(usize),
    Confirm(usize),
    Reject(usize),
    Delete(usize),
    Sweep,
}

fn arb_op(fees: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..fees).prop_map(Op::MarkPaid),
        2 => (0..fees).prop_map(Op::EditToPaid),
        2 => (0..fees, prop_oneof![Just(FeeStatus::Pending), Just(FeeStatus::Overdue)])
            .prop_map(|(i, s)| Op::Reopen(i, s)),
        1 => (0..fees).prop_map(Op::Declare),
        1 => (0..fees).prop_map(Op::Confirm),
        1 => (0..fees).prop_map(Op::Reject),
        1 => (0..fees).prop_map(Op::Delete),
        1 => Just(Op::Sweep),
    ]
}

fn arb_status() -> impl Strategy<Value = FeeStatus> {
    prop_oneof![
        Just(FeeStatus::Pending),
        Just(FeeStatus::Paid),
        Just(FeeStatus::Overdue),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

struct World {
    store: MemoryStore,
    coordinator: PropCoordinator,
    year: SocialYear,
    members: Vec<Member>,
}

async fn world(members: usize) -> World {
    let store = MemoryStore::new();
    let year = store.add_year(date(2024, 1, 1), date(2024, 12, 31)).await;
    let mut list = Vec::new();
    for i in 0..members {
        list.push(store.add_member(&format!("Socio{i}"), "Test", None).await);
    }
    let coordinator = FeeLedgerCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(MemoryAudit::default()),
        Arc::new(FixedClock::on(date(2024, 6, 1))),
    );
    World {
        store,
        coordinator,
        year,
        members: list,
    }
}

fn draft(world: &World, member: usize, due: chrono::NaiveDate) -> FeeDraft {
    FeeDraft {
        member_id: Some(world.members[member].id),
        social_year_id: Some(world.year.id),
        fee_type: "Quota associativa".into(),
        amount: Some(Decimal::new(5000, 2)),
        due_date: Some(due),
        notes: None,
    }
}

fn edit(fee: &Fee, status: FeeStatus, method: Option<PaymentMethod>) -> FeeUpdate {
    FeeUpdate {
        member_id: Some(fee.member_id),
        social_year_id: Some(fee.social_year_id),
        fee_type: fee.fee_type.clone(),
        amount: Some(fee.amount),
        due_date: Some(fee.due_date),
        status,
        payment_method: method,
        payment_details: None,
        notes: fee.notes.clone(),
    }
}

/// Checks the paid/movement/receipt agreement for every fee.
fn check_consistency(state: &MemoryState) -> Result<(), TestCaseError> {
    let mut movements_by_fee: HashMap<Uuid, usize> = HashMap::new();
    for movement in &state.movements {
        let fee_id = movement.source_fee_id.unwrap();
        prop_assert!(state.fees.contains_key(&fee_id), "movement outlived its fee");
        *movements_by_fee.entry(fee_id).or_default() += 1;
    }
    let receipts_by_fee: HashMap<Uuid, &Receipt> =
        state.receipts.iter().map(|r| (r.fee_id, r)).collect();
    prop_assert_eq!(receipts_by_fee.len(), state.receipts.len());

    for fee in state.fees.values() {
        let paid = fee.status == FeeStatus::Paid;
        let movements = movements_by_fee.get(&fee.id).copied().unwrap_or(0);

        // Paid iff exactly one movement created from it.
        prop_assert_eq!(paid, movements == 1);
        prop_assert!(movements <= 1);
        // Paid iff a receipt number is attached.
        prop_assert_eq!(paid, fee.receipt_number.is_some());
        prop_assert_eq!(paid, fee.paid_date.is_some());
        prop_assert_eq!(paid, receipts_by_fee.contains_key(&fee.id));
        if let Some(receipt) = receipts_by_fee.get(&fee.id) {
            prop_assert_eq!(Some(&receipt.receipt_number), fee.receipt_number.as_ref());
        }
        prop_assert!(!(paid && fee.payment_pending));
    }

    for receipt in &state.receipts {
        prop_assert!(state.fees.contains_key(&receipt.fee_id), "receipt outlived its fee");
    }
    Ok(())
}

async fn apply(world: &World, fees: &[Uuid], op: &Op) {
    let c = &world.coordinator;
    let actor = admin();
    // Errors such as NoDeclaredPayment or FeeNotFound after a delete are
    // expected; only consistency matters.
    match op {
        Op::MarkPaid(i) => {
            let payment = PaymentInput {
                method: PaymentMethod::Cash,
                details: None,
                notify: false,
            };
            let _ = c.mark_paid(&actor, fees[*i], payment).await;
        }
        Op::EditToPaid(i) => {
            if let Ok(Some(fee)) = c.store.find_fee(fees[*i]).await {
                let update = edit(&fee, FeeStatus::Paid, Some(PaymentMethod::Card));
                let _ = c.set_status(&actor, fee.id, update).await;
            }
        }
        Op::Reopen(i, status) => {
            if let Ok(Some(fee)) = c.store.find_fee(fees[*i]).await {
                let _ = c.set_status(&actor, fee.id, edit(&fee, *status, None)).await;
            }
        }
        Op::Declare(i) => {
            let _ = c.declare_offline_payment(&actor, fees[*i], "CRO").await;
        }
        Op::Confirm(i) => {
            let _ = c.confirm_offline_payment(&actor, fees[*i]).await;
        }
        Op::Reject(i) => {
            let _ = c.reject_offline_payment(&actor, fees[*i]).await;
        }
        Op::Delete(i) => {
            let _ = c.delete_fee(&actor, fees[*i]).await;
        }
        Op::Sweep => {
            let _ = c.update_overdue_statuses().await;
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Paid ⟺ one movement ⟺ receipt, after any sequence
    // =========================================================================

    #[test]
    fn prop_paid_fee_movement_receipt_agree(
        ops in prop::collection::vec(arb_op(4), 1..40)
    ) {
        runtime().block_on(async {
            let w = world(4).await;
            let mut fees = Vec::new();
            for i in 0..4 {
                let due = if i % 2 == 0 { date(2024, 1, 31) } else { date(2024, 12, 31) };
                fees.push(w.coordinator.create_fee(&admin(), draft(&w, i, due), false).await.unwrap().id);
            }

            for op in &ops {
                apply(&w, &fees, op).await;
                check_consistency(&w.store.snapshot().await)?;
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Pay then reopen leaves no movement and no receipt for the fee.
    #[test]
    fn prop_pay_then_reopen_round_trip(
        via_edit in any::<bool>(),
        target in prop_oneof![Just(FeeStatus::Pending), Just(FeeStatus::Overdue)],
    ) {
        runtime().block_on(async {
            let w = world(1).await;
            let fee = w.coordinator
                .create_fee(&admin(), draft(&w, 0, date(2024, 12, 31)), false)
                .await
                .unwrap();

            let paid = if via_edit {
                w.coordinator
                    .set_status(&admin(), fee.id, edit(&fee, FeeStatus::Paid, Some(PaymentMethod::Cash)))
                    .await
                    .unwrap()
            } else {
                let payment = PaymentInput { method: PaymentMethod::Cash, details: None, notify: false };
                w.coordinator.mark_paid(&admin(), fee.id, payment).await.unwrap().fee().clone()
            };
            let reopened = w.coordinator
                .set_status(&admin(), fee.id, edit(&paid, target, None))
                .await
                .unwrap();

            let state = w.store.snapshot().await;
            prop_assert_eq!(reopened.status, target);
            prop_assert!(reopened.receipt_number.is_none());
            prop_assert!(state.movements.iter().all(|m| m.source_fee_id != Some(fee.id)));
            prop_assert!(state.receipts.iter().all(|r| r.fee_id != fee.id));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // =========================================================================
    // Receipt numbers unique, increasing, gapless within a year
    // =========================================================================

    #[test]
    fn prop_receipt_numbers_follow_call_order(
        order in Just((0..8usize).collect::<Vec<_>>()).prop_shuffle()
    ) {
        runtime().block_on(async {
            let w = world(8).await;
            let mut fees = Vec::new();
            for i in 0..8 {
                fees.push(w.coordinator.create_fee(&admin(), draft(&w, i, date(2024, 12, 31)), false).await.unwrap().id);
            }

            let mut issued = Vec::new();
            for i in &order {
                let payment = PaymentInput { method: PaymentMethod::Cash, details: None, notify: false };
                let outcome = w.coordinator.mark_paid(&admin(), fees[*i], payment).await.unwrap();
                let number: ReceiptNumber = outcome.fee().receipt_number.as_deref().unwrap().parse().unwrap();
                issued.push(number);
            }

            prop_assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
            let sequences: Vec<u32> = issued.iter().map(|n| n.sequence).collect();
            prop_assert_eq!(sequences, (1..=8).collect::<Vec<u32>>());
            prop_assert!(issued.iter().all(|n| n.year == 2024));
            Ok::<(), TestCaseError>(())
        })?;
    }

    // =========================================================================
    // Overdue sweep is idempotent and never touches paid fees
    // =========================================================================

    #[test]
    fn prop_overdue_sweep_idempotent(
        fees in prop::collection::vec((arb_status(), 1u32..=365), 1..20)
    ) {
        runtime().block_on(async {
            let w = world(1).await;
            let mut paid_ids = HashSet::new();
            for (status, ordinal) in &fees {
                let due = chrono::NaiveDate::from_yo_opt(2024, *ordinal).unwrap();
                let mut fee = w.coordinator.create_fee(&admin(), draft(&w, 0, due), false).await.unwrap();
                if *status == FeeStatus::Paid {
                    let payment = PaymentInput { method: PaymentMethod::Cash, details: None, notify: false };
                    fee = w.coordinator.mark_paid(&admin(), fee.id, payment).await.unwrap().fee().clone();
                    paid_ids.insert(fee.id);
                } else if *status == FeeStatus::Overdue {
                    fee.status = FeeStatus::Overdue;
                    w.store.put_fee(fee).await;
                }
            }

            w.coordinator.update_overdue_statuses().await.unwrap();
            let once = w.store.snapshot().await.fees;
            let second = w.coordinator.update_overdue_statuses().await.unwrap();
            let twice = w.store.snapshot().await.fees;

            prop_assert_eq!(second, 0);
            prop_assert_eq!(&once, &twice);
            let today = date(2024, 6, 1);
            for fee in twice.values() {
                if paid_ids.contains(&fee.id) {
                    prop_assert_eq!(fee.status, FeeStatus::Paid);
                } else if fee.due_date < today {
                    prop_assert_eq!(fee.status, FeeStatus::Overdue);
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    // =========================================================================
    // Bulk creation never duplicates (member, year)
    // =========================================================================

    #[test]
    fn prop_bulk_never_duplicates(
        first in prop::collection::vec(0..6usize, 1..10),
        second in prop::collection::vec(0..6usize, 1..10),
    ) {
        runtime().block_on(async {
            let w = world(6).await;
            let request = |picks: &[usize]| BulkFeeRequest {
                social_year_id: w.year.id,
                member_ids: picks.iter().map(|i| w.members[*i].id).collect(),
                base_amount: Decimal::new(5000, 2),
                due_date: date(2024, 12, 31),
                fee_type: "Quota associativa".into(),
                use_previous_amount: false,
                percentage_adjustment: None,
                notify: false,
                notes: None,
            };

            let a = w.coordinator.bulk_create_fees(&admin(), request(&first)).await.unwrap();
            let b = w.coordinator.bulk_create_fees(&admin(), request(&second)).await.unwrap();

            let state = w.store.snapshot().await;
            let mut seen = HashSet::new();
            for fee in state.fees.values() {
                prop_assert!(seen.insert((fee.member_id, fee.social_year_id)));
            }

            let distinct: HashSet<usize> = first.iter().chain(second.iter()).copied().collect();
            prop_assert_eq!(state.fees.len(), distinct.len());
            prop_assert_eq!((a.created + a.skipped) as usize, first.len());
            prop_assert_eq!((b.created + b.skipped) as usize, second.len());
            Ok::<(), TestCaseError>(())
        })?;
    }
}
