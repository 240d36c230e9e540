//! SQL schema for the DRACO SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS profiles (
    profile_id   TEXT PRIMARY KEY,
    badge_number TEXT NOT NULL,
    full_name    TEXT NOT NULL,
    role         TEXT NOT NULL,              -- 'agent' | 'delegate'
    unit         TEXT,
    phone        TEXT,
    email        TEXT,
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    profile_id    TEXT PRIMARY KEY REFERENCES profiles(profile_id),
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,             -- argon2 PHC string
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,             -- SHA-256 hex of the bearer token
    profile_id TEXT NOT NULL REFERENCES profiles(profile_id),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cases (
    case_id              TEXT PRIMARY KEY,
    inquiry_number       TEXT NOT NULL UNIQUE,
    title                TEXT NOT NULL,
    description          TEXT,
    location             TEXT,
    status               TEXT NOT NULL,      -- 'active'|'investigation'|'suspended'|'closed'
    priority             TEXT NOT NULL,      -- 'low'|'medium'|'high'|'urgent'
    responsible_agent    TEXT NOT NULL REFERENCES profiles(profile_id),
    supervising_delegate TEXT REFERENCES profiles(profile_id),
    suspects             TEXT NOT NULL DEFAULT '[]',
    opened_at            TEXT NOT NULL,
    closed_at            TEXT
);

CREATE TABLE IF NOT EXISTS evidence (
    evidence_id  TEXT PRIMARY KEY,
    case_id      TEXT NOT NULL REFERENCES cases(case_id),
    kind         TEXT NOT NULL,
    description  TEXT NOT NULL,
    file_url     TEXT,
    file_name    TEXT,
    file_hash    TEXT,                       -- SHA-256 hex of the stored bytes
    collected_by TEXT NOT NULL REFERENCES profiles(profile_id),
    collected_at TEXT NOT NULL
);

-- The chain of custody is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table; seq preserves the
-- legal insertion order.
CREATE TABLE IF NOT EXISTS custody_events (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id    TEXT NOT NULL UNIQUE,
    evidence_id TEXT NOT NULL REFERENCES evidence(evidence_id),
    action      TEXT NOT NULL,               -- 'upload'|'transfer'|'analysis'|'storage'|'return'
    actor       TEXT NOT NULL REFERENCES profiles(profile_id),
    recorded_at TEXT NOT NULL,
    note        TEXT
);

-- Exactly one of recipient / case_id scopes a message.
CREATE TABLE IF NOT EXISTS messages (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    message_id TEXT NOT NULL UNIQUE,
    sender     TEXT NOT NULL REFERENCES profiles(profile_id),
    recipient  TEXT REFERENCES profiles(profile_id),
    case_id    TEXT REFERENCES cases(case_id),
    content    TEXT NOT NULL,
    kind       TEXT NOT NULL DEFAULT 'text',
    created_at TEXT NOT NULL,
    CHECK ((recipient IS NULL) != (case_id IS NULL))
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    owner           TEXT NOT NULL REFERENCES profiles(profile_id),
    title           TEXT NOT NULL,
    body            TEXT,
    kind            TEXT NOT NULL DEFAULT 'info',
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS cases_agent_idx        ON cases(responsible_agent);
CREATE INDEX IF NOT EXISTS cases_opened_idx       ON cases(opened_at);
CREATE INDEX IF NOT EXISTS evidence_case_idx      ON evidence(case_id);
CREATE INDEX IF NOT EXISTS custody_evidence_idx   ON custody_events(evidence_id);
CREATE INDEX IF NOT EXISTS messages_sender_idx    ON messages(sender);
CREATE INDEX IF NOT EXISTS messages_recipient_idx ON messages(recipient);
CREATE INDEX IF NOT EXISTS messages_case_idx      ON messages(case_id);
CREATE INDEX IF NOT EXISTS notifications_owner_idx ON notifications(owner);

PRAGMA user_version = 1;
";
