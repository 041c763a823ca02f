//! SQLite schema definition
//!
//! Touchpoints and transitions are append-only and never revised. Journey
//! stage rows are created on entry and closed (not deleted) on exit; the
//! partial unique index below enforces at most one open row per contact at
//! the database level. Conversions are write-once with the attribution
//! split frozen into the `attributions` JSON column at insert time.

pub const SCHEMA: &str = r#"
-- ============================================
-- TOUCHPOINTS
-- ============================================

-- Channel-level contact interactions, append-only
CREATE TABLE IF NOT EXISTS touchpoints (
    id TEXT PRIMARY KEY,                   -- UUID
    business_id TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    channel TEXT NOT NULL,                 -- 'email'|'social'|'paid'|'referral'|'organic'|'direct'
    campaign_id TEXT,
    metadata TEXT,                         -- JSON: opaque, never inspected
    timestamp INTEGER NOT NULL             -- epoch ms
);

-- ============================================
-- CONVERSIONS
-- ============================================

-- Realized-revenue events, write-once
CREATE TABLE IF NOT EXISTS conversions (
    id TEXT PRIMARY KEY,                   -- UUID
    business_id TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    amount REAL NOT NULL,
    conversion_type TEXT NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    source TEXT NOT NULL,                  -- channel of last prior touchpoint
    attributions TEXT NOT NULL,            -- JSON: model -> channel -> credit, frozen
    metadata TEXT,
    converted_at INTEGER NOT NULL,         -- epoch ms
    timestamp INTEGER NOT NULL             -- epoch ms, insert time
);

-- ============================================
-- JOURNEY STAGES
-- ============================================

-- Current-state stage records; exited_at IS NULL marks the open row
CREATE TABLE IF NOT EXISTS journey_stages (
    id TEXT PRIMARY KEY,                   -- UUID
    business_id TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    stage TEXT NOT NULL,                   -- 'awareness'..'advocacy'
    entered_at INTEGER NOT NULL,           -- epoch ms
    exited_at INTEGER,                     -- NULL = current stage
    touchpoints TEXT NOT NULL DEFAULT '[]',-- JSON array of touchpoint ids
    triggered_by TEXT,
    metadata TEXT
);

-- Append-only transition log; from_stage 'none' marks a first entry
CREATE TABLE IF NOT EXISTS journey_transitions (
    id TEXT PRIMARY KEY,                   -- UUID
    business_id TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    from_stage TEXT NOT NULL,              -- stage name or 'none'
    to_stage TEXT NOT NULL,
    transitioned_at INTEGER NOT NULL       -- epoch ms
);

-- ============================================
-- INDEXES
-- ============================================

-- Touchpoint indexes
CREATE INDEX IF NOT EXISTS idx_touchpoints_contact ON touchpoints(business_id, contact_id);
CREATE INDEX IF NOT EXISTS idx_touchpoints_time ON touchpoints(business_id, timestamp);

-- Conversion indexes
CREATE INDEX IF NOT EXISTS idx_conversions_contact ON conversions(business_id, contact_id);
CREATE INDEX IF NOT EXISTS idx_conversions_time ON conversions(business_id, converted_at);

-- Journey indexes
CREATE INDEX IF NOT EXISTS idx_stages_contact ON journey_stages(business_id, contact_id);
CREATE INDEX IF NOT EXISTS idx_stages_entered ON journey_stages(business_id, entered_at);
CREATE UNIQUE INDEX IF NOT EXISTS idx_stages_open
    ON journey_stages(business_id, contact_id) WHERE exited_at IS NULL;

CREATE INDEX IF NOT EXISTS idx_transitions_contact ON journey_transitions(business_id, contact_id);
CREATE INDEX IF NOT EXISTS idx_transitions_time ON journey_transitions(business_id, transitioned_at);
"#;
