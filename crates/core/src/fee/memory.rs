//! In-memory store, notifier and audit log for coordinator tests.
//!
//! A transaction holds the single state lock for its whole lifetime and
//! works on a copy; commit swaps the copy in, drop discards it. That gives
//! the same all-or-nothing and serialization guarantees the row locks give
//! in PostgreSQL.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sodalis_shared::OutgoingEmail;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::audit::{AuditEntry, AuditError, AuditLog};
use super::error::FeeError;
use super::notify::Notifier;
use super::store::{FeeStore, FeeTransaction};
use super::types::{
    Fee, FeeFilter, FeeStatus, LedgerMovement, Member, MorosoEntry, Receipt, SocialYear,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub fees: BTreeMap<Uuid, Fee>,
    pub members: HashMap<Uuid, Member>,
    pub years: HashMap<Uuid, SocialYear>,
    pub movements: Vec<LedgerMovement>,
    pub receipts: Vec<Receipt>,
    pub counters: HashMap<i32, u32>,
    pub category_id: Uuid,
}

type Faults = Arc<StdMutex<HashSet<&'static str>>>;

fn check(faults: &Faults, op: &'static str) -> Result<(), FeeError> {
    let faults = faults.lock().unwrap();
    if faults.contains(op) {
        if op == "begin" {
            return Err(FeeError::Unavailable("connection refused".into()));
        }
        return Err(FeeError::Persistence(format!("injected failure in {op}")));
    }
    Ok(())
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        let state = MemoryState {
            category_id: Uuid::new_v4(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            faults: Faults::default(),
        }
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn add_member(&self, first: &str, last: &str, email: Option<&str>) -> Member {
        let member = Member {
            id: Uuid::new_v4(),
            first_name: first.into(),
            last_name: last.into(),
            email: email.map(str::to_string),
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .members
            .insert(member.id, member.clone());
        member
    }

    pub async fn add_year(&self, start: NaiveDate, end: NaiveDate) -> SocialYear {
        let year = SocialYear {
            id: Uuid::new_v4(),
            name: start.format("%Y").to_string(),
            start_date: start,
            end_date: end,
            is_current: true,
        };
        self.state.lock().await.years.insert(year.id, year.clone());
        year
    }

    pub async fn put_fee(&self, fee: Fee) {
        self.state.lock().await.fees.insert(fee.id, fee);
    }

    pub fn fail_on(&self, op: &'static str) {
        self.faults.lock().unwrap().insert(op);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().unwrap().clear();
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    faults: Faults,
}

impl FeeStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, FeeError> {
        check(&self.faults, "begin")?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx {
            guard,
            working,
            faults: Arc::clone(&self.faults),
        })
    }

    async fn find_fee(&self, id: Uuid) -> Result<Option<Fee>, FeeError> {
        Ok(self.state.lock().await.fees.get(&id).cloned())
    }

    async fn list_fees(
        &self,
        filter: &FeeFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Fee>, u64), FeeError> {
        let state = self.state.lock().await;
        let mut fees: Vec<Fee> = state
            .fees
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        fees.sort_by_key(|f| (f.due_date, f.id));
        let total = fees.len() as u64;
        let page = fees
            .into_iter()
            .skip(usize::try_from(offset).unwrap())
            .take(usize::try_from(limit).unwrap())
            .collect();
        Ok((page, total))
    }

    async fn find_receipt(&self, fee_id: Uuid) -> Result<Option<Receipt>, FeeError> {
        let state = self.state.lock().await;
        Ok(state.receipts.iter().find(|r| r.fee_id == fee_id).cloned())
    }

    async fn movements_for_fee(&self, fee_id: Uuid) -> Result<Vec<LedgerMovement>, FeeError> {
        let state = self.state.lock().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.source_fee_id == Some(fee_id))
            .cloned()
            .collect())
    }

    async fn mark_overdue(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<u64, FeeError> {
        check(&self.faults, "mark_overdue")?;
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for fee in state.fees.values_mut() {
            if let Some(status) = super::transition::swept_status(fee.status, fee.due_date, today) {
                fee.status = status;
                fee.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn count_members_with_overdue(&self, social_year_id: Uuid) -> Result<u64, FeeError> {
        let state = self.state.lock().await;
        let members: HashSet<Uuid> = state
            .fees
            .values()
            .filter(|f| f.social_year_id == social_year_id && f.status == FeeStatus::Overdue)
            .map(|f| f.member_id)
            .collect();
        Ok(members.len() as u64)
    }

    async fn sum_amounts(
        &self,
        social_year_id: Uuid,
        statuses: &[FeeStatus],
    ) -> Result<Decimal, FeeError> {
        let state = self.state.lock().await;
        Ok(state
            .fees
            .values()
            .filter(|f| f.social_year_id == social_year_id && statuses.contains(&f.status))
            .map(|f| f.amount)
            .sum())
    }

    async fn pending_due_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Fee>, FeeError> {
        let state = self.state.lock().await;
        let mut fees: Vec<Fee> = state
            .fees
            .values()
            .filter(|f| f.status == FeeStatus::Pending && f.due_date >= from && f.due_date <= to)
            .cloned()
            .collect();
        fees.sort_by_key(|f| f.due_date);
        Ok(fees)
    }

    async fn morosi(&self, social_year_id: Uuid) -> Result<Vec<MorosoEntry>, FeeError> {
        let state = self.state.lock().await;
        let mut by_member: BTreeMap<Uuid, (u64, Decimal)> = BTreeMap::new();
        for fee in state.fees.values().filter(|f| {
            f.social_year_id == social_year_id && f.status == FeeStatus::Overdue
        }) {
            let entry = by_member.entry(fee.member_id).or_default();
            entry.0 += 1;
            entry.1 += fee.amount;
        }
        let mut entries: Vec<MorosoEntry> = by_member
            .into_iter()
            .filter_map(|(member_id, (count, amount))| {
                let member = state.members.get(&member_id)?;
                Some(MorosoEntry {
                    member_id,
                    member_name: member.display_name(),
                    email: member.email.clone(),
                    overdue_fees: count,
                    overdue_amount: amount,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.member_name.cmp(&b.member_name));
        Ok(entries)
    }
}

impl FeeTransaction for MemoryTx {
    async fn lock_fee(&mut self, id: Uuid) -> Result<Option<Fee>, FeeError> {
        check(&self.faults, "lock_fee")?;
        Ok(self.working.fees.get(&id).cloned())
    }

    async fn lock_social_year(&mut self, id: Uuid) -> Result<Option<SocialYear>, FeeError> {
        Ok(self.working.years.get(&id).cloned())
    }

    async fn find_social_year(&mut self, id: Uuid) -> Result<Option<SocialYear>, FeeError> {
        Ok(self.working.years.get(&id).cloned())
    }

    async fn find_member(&mut self, id: Uuid) -> Result<Option<Member>, FeeError> {
        Ok(self.working.members.get(&id).cloned())
    }

    async fn member_has_fee(
        &mut self,
        member_id: Uuid,
        social_year_id: Uuid,
    ) -> Result<bool, FeeError> {
        Ok(self
            .working
            .fees
            .values()
            .any(|f| f.member_id == member_id && f.social_year_id == social_year_id))
    }

    async fn previous_fee_amount(
        &mut self,
        member_id: Uuid,
        before: NaiveDate,
    ) -> Result<Option<Decimal>, FeeError> {
        let years = &self.working.years;
        Ok(self
            .working
            .fees
            .values()
            .filter(|f| f.member_id == member_id)
            .filter_map(|f| {
                let start = years.get(&f.social_year_id)?.start_date;
                (start < before).then_some((start, f.created_at, f.amount))
            })
            .max_by_key(|(start, created, _)| (*start, *created))
            .map(|(_, _, amount)| amount))
    }

    async fn insert_fee(&mut self, fee: &Fee) -> Result<(), FeeError> {
        check(&self.faults, "insert_fee")?;
        self.working.fees.insert(fee.id, fee.clone());
        Ok(())
    }

    async fn update_fee(&mut self, fee: &Fee) -> Result<(), FeeError> {
        check(&self.faults, "update_fee")?;
        self.working.fees.insert(fee.id, fee.clone());
        Ok(())
    }

    async fn delete_fee(&mut self, id: Uuid) -> Result<(), FeeError> {
        check(&self.faults, "delete_fee")?;
        self.working.fees.remove(&id);
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &LedgerMovement) -> Result<(), FeeError> {
        check(&self.faults, "insert_movement")?;
        if movement.source_fee_id.is_some()
            && self
                .working
                .movements
                .iter()
                .any(|m| m.source_fee_id == movement.source_fee_id)
        {
            return Err(FeeError::Persistence(
                "duplicate key value violates unique constraint \"movements_source_fee_id_key\""
                    .into(),
            ));
        }
        self.working.movements.push(movement.clone());
        Ok(())
    }

    async fn delete_movements_for_fee(&mut self, fee_id: Uuid) -> Result<u64, FeeError> {
        let before = self.working.movements.len();
        self.working
            .movements
            .retain(|m| m.source_fee_id != Some(fee_id));
        Ok((before - self.working.movements.len()) as u64)
    }

    async fn fee_income_category(&mut self) -> Result<Uuid, FeeError> {
        Ok(self.working.category_id)
    }

    async fn next_receipt_sequence(&mut self, year: i32) -> Result<u32, FeeError> {
        check(&self.faults, "next_receipt_sequence")?;
        let counter = self.working.counters.entry(year).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn receipt_for_fee(&mut self, fee_id: Uuid) -> Result<Option<Receipt>, FeeError> {
        Ok(self
            .working
            .receipts
            .iter()
            .find(|r| r.fee_id == fee_id)
            .cloned())
    }

    async fn insert_receipt(&mut self, receipt: &Receipt) -> Result<(), FeeError> {
        check(&self.faults, "insert_receipt")?;
        if self.working.receipts.iter().any(|r| {
            r.fee_id == receipt.fee_id || r.receipt_number == receipt.receipt_number
        }) {
            return Err(FeeError::Persistence(
                "duplicate key value violates unique constraint on receipts".into(),
            ));
        }
        self.working.receipts.push(receipt.clone());
        Ok(())
    }

    async fn delete_receipt_for_fee(&mut self, fee_id: Uuid) -> Result<u64, FeeError> {
        let before = self.working.receipts.len();
        self.working.receipts.retain(|r| r.fee_id != fee_id);
        Ok((before - self.working.receipts.len()) as u64)
    }

    async fn commit(self) -> Result<(), FeeError> {
        check(&self.faults, "commit")?;
        let Self {
            mut guard, working, ..
        } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), FeeError> {
        Ok(())
    }
}

/// Records every accepted message.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: StdMutex<Vec<OutgoingEmail>>,
    pub refuse: bool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn queue_or_send(&self, message: OutgoingEmail) -> bool {
        if self.refuse {
            return false;
        }
        self.sent.lock().unwrap().push(message);
        true
    }
}

/// Records every entry, or fails every write when `failing` is set.
#[derive(Default)]
pub struct MemoryAudit {
    pub entries: StdMutex<Vec<AuditEntry>>,
    pub failing: bool,
}

impl MemoryAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditLog for MemoryAudit {
    async fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        if self.failing {
            return Err(AuditError("audit table unavailable".into()));
        }
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}
