//! Initial database migration.
//!
//! Creates the member, social year, fee, movement, receipt and audit tables
//! with the constraints that keep the fee ledger consistent.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: REGISTRY
        // ============================================================
        db.execute_unprepared(MEMBERS_SQL).await?;
        db.execute_unprepared(SOCIAL_YEARS_SQL).await?;

        // ============================================================
        // PART 2: FEES
        // ============================================================
        db.execute_unprepared(FEES_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(MOVEMENT_CATEGORIES_SQL).await?;
        db.execute_unprepared(MOVEMENTS_SQL).await?;

        // ============================================================
        // PART 4: RECEIPTS
        // ============================================================
        db.execute_unprepared(RECEIPT_COUNTERS_SQL).await?;
        db.execute_unprepared(RECEIPTS_SQL).await?;

        // ============================================================
        // PART 5: AUDIT
        // ============================================================
        db.execute_unprepared(AUDIT_LOG_SQL).await?;

        // ============================================================
        // PART 6: SEED DATA
        // ============================================================
        db.execute_unprepared(SEED_CATEGORIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const MEMBERS_SQL: &str = r"
CREATE TABLE members (
    id UUID PRIMARY KEY,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    email VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_members_name ON members(last_name, first_name);
";

const SOCIAL_YEARS_SQL: &str = r"
CREATE TABLE social_years (
    id UUID PRIMARY KEY,
    name VARCHAR(50) NOT NULL UNIQUE,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_current BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_social_year_range CHECK (end_date > start_date)
);

-- At most one current year
CREATE UNIQUE INDEX idx_social_years_current ON social_years(is_current) WHERE is_current;
";

const FEES_SQL: &str = r"
CREATE TABLE fees (
    id UUID PRIMARY KEY,
    member_id UUID NOT NULL REFERENCES members(id) ON DELETE RESTRICT,
    social_year_id UUID NOT NULL REFERENCES social_years(id) ON DELETE RESTRICT,
    fee_type VARCHAR(100) NOT NULL,
    amount NUMERIC(12, 2) NOT NULL,
    due_date DATE NOT NULL,
    paid_date DATE,
    payment_method VARCHAR(16),
    receipt_number VARCHAR(16),
    status VARCHAR(16) NOT NULL DEFAULT 'pending',
    payment_pending BOOLEAN NOT NULL DEFAULT FALSE,
    payment_reference VARCHAR(255),
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_fee_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_fee_status CHECK (status IN ('pending', 'paid', 'overdue')),
    CONSTRAINT chk_fee_payment_method CHECK (
        payment_method IS NULL
        OR payment_method IN ('cash', 'bank_transfer', 'card', 'paypal', 'other')
    ),
    CONSTRAINT chk_fee_paid_date CHECK ((status = 'paid') = (paid_date IS NOT NULL)),
    CONSTRAINT chk_fee_receipt CHECK ((status = 'paid') = (receipt_number IS NOT NULL)),
    CONSTRAINT chk_fee_pending_flag CHECK (NOT (payment_pending AND status = 'paid'))
);

CREATE UNIQUE INDEX idx_fees_receipt_number ON fees(receipt_number) WHERE receipt_number IS NOT NULL;
CREATE INDEX idx_fees_member_year ON fees(member_id, social_year_id);
CREATE INDEX idx_fees_status_due ON fees(status, due_date);
";

const MOVEMENT_CATEGORIES_SQL: &str = r"
CREATE TABLE movement_categories (
    id UUID PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL,
    movement_type VARCHAR(16) NOT NULL,

    CONSTRAINT chk_category_type CHECK (movement_type IN ('income', 'expense'))
);
";

const MOVEMENTS_SQL: &str = r"
CREATE TABLE movements (
    id UUID PRIMARY KEY,
    movement_type VARCHAR(16) NOT NULL,
    category_id UUID NOT NULL REFERENCES movement_categories(id) ON DELETE RESTRICT,
    description VARCHAR(255) NOT NULL,
    amount NUMERIC(12, 2) NOT NULL,
    paid_at DATE NOT NULL,
    social_year_id UUID REFERENCES social_years(id) ON DELETE RESTRICT,
    member_id UUID REFERENCES members(id) ON DELETE RESTRICT,
    payment_method VARCHAR(16),
    receipt_number VARCHAR(16),
    notes TEXT,
    source_fee_id UUID UNIQUE REFERENCES fees(id) ON DELETE RESTRICT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_movement_type CHECK (movement_type IN ('income', 'expense')),
    CONSTRAINT chk_movement_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_movements_year ON movements(social_year_id, paid_at);
";

const RECEIPT_COUNTERS_SQL: &str = r"
CREATE TABLE receipt_counters (
    year INTEGER PRIMARY KEY,
    last_sequence INTEGER NOT NULL,

    CONSTRAINT chk_counter_positive CHECK (last_sequence > 0)
);
";

const RECEIPTS_SQL: &str = r"
CREATE TABLE receipts (
    id UUID PRIMARY KEY,
    fee_id UUID NOT NULL UNIQUE REFERENCES fees(id) ON DELETE RESTRICT,
    year INTEGER NOT NULL,
    sequence INTEGER NOT NULL,
    receipt_number VARCHAR(16) NOT NULL UNIQUE,
    payment_method VARCHAR(16) NOT NULL,
    payment_details TEXT,
    issued_by UUID NOT NULL,
    generated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_receipt_year_sequence UNIQUE (year, sequence),
    CONSTRAINT chk_receipt_sequence_positive CHECK (sequence > 0)
);
";

const AUDIT_LOG_SQL: &str = r"
CREATE TABLE audit_log (
    id UUID PRIMARY KEY,
    action VARCHAR(16) NOT NULL,
    entity_type VARCHAR(50) NOT NULL,
    entity_id UUID NOT NULL,
    label VARCHAR(255) NOT NULL,
    old_values JSONB,
    new_values JSONB,
    actor_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_audit_log_entity ON audit_log(entity_type, entity_id, created_at);
";

const SEED_CATEGORIES_SQL: &str = r"
INSERT INTO movement_categories (id, code, name, movement_type) VALUES
    ('018e0000-0000-7000-8000-000000000001', 'membership_fees', 'Quote associative', 'income'),
    ('018e0000-0000-7000-8000-000000000002', 'donations', 'Donazioni', 'income'),
    ('018e0000-0000-7000-8000-000000000003', 'general_expenses', 'Spese generali', 'expense');
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS audit_log;
DROP TABLE IF EXISTS receipts;
DROP TABLE IF EXISTS receipt_counters;
DROP TABLE IF EXISTS movements;
DROP TABLE IF EXISTS movement_categories;
DROP TABLE IF EXISTS fees;
DROP TABLE IF EXISTS social_years;
DROP TABLE IF EXISTS members;
";
