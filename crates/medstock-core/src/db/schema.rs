//! SQLite schema definition.

/// Complete database schema for the stock ledger and care scheduling engine.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients and Access
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_owner ON patients(owner_id);

-- Users other than the owner who may act on a patient
CREATE TABLE IF NOT EXISTS patient_shares (
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    PRIMARY KEY (patient_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_patient_shares_user ON patient_shares(user_id);

CREATE TABLE IF NOT EXISTS caregivers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    phone TEXT,
    owner_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Medications
-- ============================================================================

-- Stock is never stored here; it is derived from stock_movements.
CREATE TABLE IF NOT EXISTS medications (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    dosage_amount TEXT NOT NULL DEFAULT '0',     -- decimal as text
    dosage_unit TEXT NOT NULL DEFAULT '',
    form TEXT NOT NULL DEFAULT '',
    route TEXT NOT NULL DEFAULT '',
    box_size INTEGER NOT NULL DEFAULT 0,
    instructions TEXT,
    owner_id TEXT NOT NULL,
    prescription_id TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_medications_owner ON medications(owner_id);

CREATE TABLE IF NOT EXISTS medication_patients (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    frequency TEXT NOT NULL,
    administration_times TEXT NOT NULL DEFAULT '[]', -- JSON array of times
    half_dose INTEGER NOT NULL DEFAULT 0,
    custom_frequency TEXT,
    as_needed INTEGER NOT NULL DEFAULT 0,
    treatment_type TEXT NOT NULL CHECK (treatment_type IN ('continuous', 'time_boxed')),
    start_date TEXT NOT NULL,
    end_date TEXT,
    tapering INTEGER NOT NULL DEFAULT 0,
    daily_consumption TEXT NOT NULL DEFAULT '0', -- decimal as text
    created_at TEXT NOT NULL,
    UNIQUE (medication_id, patient_id)
);

CREATE INDEX IF NOT EXISTS idx_medication_patients_patient ON medication_patients(patient_id);

-- ============================================================================
-- Stock Ledger (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS stock_movements (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
    direction TEXT NOT NULL CHECK (direction IN ('in', 'out')),
    quantity TEXT NOT NULL,                      -- decimal as text
    created_at TEXT NOT NULL,
    source TEXT NOT NULL DEFAULT '',
    price TEXT,                                  -- decimal as text
    total_installments INTEGER,
    actor_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_movements_medication ON stock_movements(medication_id);

CREATE TRIGGER IF NOT EXISTS stock_movements_no_update BEFORE UPDATE ON stock_movements
BEGIN
    SELECT RAISE(ABORT, 'Stock movements are append-only');
END;

-- ============================================================================
-- Alert Settings
-- ============================================================================

CREATE TABLE IF NOT EXISTS alert_settings (
    user_id TEXT PRIMARY KEY,
    critical_stock_threshold INTEGER NOT NULL,
    low_stock_threshold INTEGER NOT NULL,
    medication_delay TEXT NOT NULL,              -- JSON {enabled, channels}
    low_stock TEXT NOT NULL,
    critical_stock TEXT NOT NULL,
    prescription_expiry TEXT NOT NULL,
    replenishment_request TEXT NOT NULL,
    quiet_hours_enabled INTEGER NOT NULL DEFAULT 0,
    quiet_hours_start TEXT NOT NULL,
    quiet_hours_end TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================================================
-- Replenishment Requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS replenishment_requests (
    id TEXT PRIMARY KEY,
    medication_id TEXT NOT NULL REFERENCES medications(id) ON DELETE CASCADE,
    requester_id TEXT NOT NULL,
    requested_at TEXT NOT NULL,
    requested_quantity TEXT NOT NULL,            -- decimal as text
    urgency TEXT NOT NULL CHECK (urgency IN ('low', 'medium', 'high')),
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed', 'rejected')),
    notes TEXT,
    completed_at TEXT,
    added_quantity TEXT,                         -- decimal as text
    owner_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_replenishment_owner_status ON replenishment_requests(owner_id, status);
CREATE INDEX IF NOT EXISTS idx_replenishment_requester ON replenishment_requests(requester_id);

-- ============================================================================
-- Caregiver Schedules
-- ============================================================================

CREATE TABLE IF NOT EXISTS caregiver_schedules (
    id TEXT PRIMARY KEY,
    caregiver_id TEXT NOT NULL REFERENCES caregivers(id) ON DELETE CASCADE,
    weekdays TEXT NOT NULL,                      -- JSON array of weekdays
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_schedules_owner ON caregiver_schedules(owner_id);

CREATE TABLE IF NOT EXISTS caregiver_schedule_patients (
    schedule_id TEXT NOT NULL REFERENCES caregiver_schedules(id) ON DELETE CASCADE,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    PRIMARY KEY (schedule_id, patient_id)
);

CREATE INDEX IF NOT EXISTS idx_schedule_patients_patient ON caregiver_schedule_patients(patient_id);
"#;
