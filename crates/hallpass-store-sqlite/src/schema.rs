//! SQL schema for the HallPass SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    role_json   TEXT NOT NULL,   -- serde-tagged Role variant
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; store-assigned
);

CREATE TABLE IF NOT EXISTS accounts (
    email         TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL, -- argon2 PHC string
    identity_id   TEXT NOT NULL REFERENCES identities(identity_id),
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS requests (
    request_id TEXT PRIMARY KEY,
    requester  TEXT NOT NULL REFERENCES identities(identity_id),
    name       TEXT NOT NULL,
    reg_no     TEXT NOT NULL,
    hostel     TEXT NOT NULL,
    reason     TEXT NOT NULL,
    status     TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);

-- Access logs are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS logs (
    log_id      TEXT PRIMARY KEY,
    subject     TEXT NOT NULL,
    name        TEXT NOT NULL,
    reg_no      TEXT NOT NULL,
    direction   TEXT NOT NULL,      -- 'entry' | 'exit'
    recorded_at TEXT NOT NULL,
    curfew      INTEGER NOT NULL,   -- entry logged during the curfew window
    approved    INTEGER NOT NULL,   -- bearer held an approved request
    guard       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tickets (
    ticket_id   TEXT PRIMARY KEY,
    requester   TEXT NOT NULL REFERENCES identities(identity_id),
    name        TEXT NOT NULL,
    room        TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'Open',
    created_at  TEXT NOT NULL
);

-- Announcements are write-once; no id is exposed to callers.
CREATE TABLE IF NOT EXISTS announcements (
    message   TEXT NOT NULL,
    audience  TEXT NOT NULL,   -- 'All' or a hostel code
    posted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS accounts_identity_idx  ON accounts(identity_id);
CREATE INDEX IF NOT EXISTS requests_requester_idx ON requests(requester);
CREATE INDEX IF NOT EXISTS requests_status_idx    ON requests(status);
CREATE INDEX IF NOT EXISTS requests_created_idx   ON requests(created_at);
CREATE INDEX IF NOT EXISTS logs_reg_no_idx        ON logs(reg_no);
CREATE INDEX IF NOT EXISTS logs_recorded_idx      ON logs(recorded_at);
CREATE INDEX IF NOT EXISTS tickets_requester_idx  ON tickets(requester);
CREATE INDEX IF NOT EXISTS tickets_created_idx    ON tickets(created_at);
CREATE INDEX IF NOT EXISTS announcements_posted_idx ON announcements(posted_at);

PRAGMA user_version = 1;
";
