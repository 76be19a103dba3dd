//! SQL schema for the Lattix SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id            TEXT PRIMARY KEY,
    email              TEXT NOT NULL UNIQUE,
    display_name       TEXT,
    created_at         TEXT NOT NULL,
    reminder_enabled   INTEGER NOT NULL DEFAULT 0,
    reminder_time      TEXT,                          -- 'HH:MM', local
    reminder_timezone  TEXT NOT NULL DEFAULT 'UTC',   -- IANA name
    reminder_last_sent TEXT,                          -- RFC 3339 UTC
    testimonial_state  TEXT NOT NULL DEFAULT 'not_asked'
);

CREATE TABLE IF NOT EXISTS roadmaps (
    roadmap_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    title      TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'active',  -- 'active' | 'completed' | 'archived'
    created_at TEXT NOT NULL
);

-- Status only ever moves locked -> unlocked -> completed.
CREATE TABLE IF NOT EXISTS roadmap_steps (
    step_id        TEXT PRIMARY KEY,
    roadmap_id     TEXT NOT NULL REFERENCES roadmaps(roadmap_id) ON DELETE CASCADE,
    step_order     INTEGER NOT NULL CHECK (step_order >= 1),
    status         TEXT NOT NULL CHECK (status IN ('locked', 'unlocked', 'completed')),
    content_id     TEXT NOT NULL,
    plan_situation TEXT,
    plan_trigger   TEXT,
    plan_action    TEXT,
    unlocked_at    TEXT,
    completed_at   TEXT,
    UNIQUE (roadmap_id, step_order)
);

-- Append-only. Rows disappear only when their user is deleted.
CREATE TABLE IF NOT EXISTS notification_logs (
    log_id     TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    step_id    TEXT REFERENCES roadmap_steps(step_id) ON DELETE SET NULL,
    status     TEXT NOT NULL,   -- 'sent' | 'failed' | 'skipped'
    detail     TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS roadmaps_user_idx      ON roadmaps(user_id);
CREATE INDEX IF NOT EXISTS steps_roadmap_idx      ON roadmap_steps(roadmap_id);
CREATE INDEX IF NOT EXISTS notifications_user_idx ON notification_logs(user_id);
CREATE INDEX IF NOT EXISTS users_reminder_idx     ON users(reminder_enabled);

PRAGMA user_version = 1;
";
