//! SQL schema for the census SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per accepted batch. Ids are never reused.
CREATE TABLE IF NOT EXISTS imports (
    import_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at  TEXT NOT NULL        -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS citizens (
    import_id   INTEGER NOT NULL REFERENCES imports(import_id),
    citizen_id  INTEGER NOT NULL,
    town        TEXT NOT NULL,
    street      TEXT NOT NULL,
    building    TEXT NOT NULL,
    apartment   INTEGER NOT NULL,
    name        TEXT NOT NULL,
    birth_date  TEXT NOT NULL,       -- YYYY-MM-DD
    gender      TEXT NOT NULL CHECK (gender IN ('male', 'female')),
    PRIMARY KEY (import_id, citizen_id)
);

-- Directed edges; the store keeps both directions of every relation.
CREATE TABLE IF NOT EXISTS relatives (
    import_id   INTEGER NOT NULL,
    citizen_id  INTEGER NOT NULL,
    relative_id INTEGER NOT NULL,
    PRIMARY KEY (import_id, citizen_id, relative_id),
    FOREIGN KEY (import_id, citizen_id)
        REFERENCES citizens(import_id, citizen_id),
    FOREIGN KEY (import_id, relative_id)
        REFERENCES citizens(import_id, citizen_id)
);

CREATE INDEX IF NOT EXISTS citizens_town_idx ON citizens(import_id, town);

PRAGMA user_version = 1;
";
