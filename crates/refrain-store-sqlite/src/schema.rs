//! SQL schema for the Refrain SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// One logical `items` table for all languages; `partition` is a column,
/// not a table suffix, so the per-language dedup scope survives without
/// schema duplication.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS items (
    item_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    partition    TEXT NOT NULL,     -- 'en' | 'es' | 'fr' | 'de'
    text         TEXT NOT NULL,
    review_state TEXT NOT NULL,     -- 'new' | 'learning' | 'review' | 'relearning'
    repetitions  INTEGER NOT NULL DEFAULT 0,
    lapses       INTEGER NOT NULL DEFAULT 0,
    last_rating  TEXT,              -- NULL until the first review
    due_at       TEXT NOT NULL,     -- RFC 3339 UTC
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    revision     INTEGER NOT NULL DEFAULT 0
);

-- Selection order: most overdue first, insertion order as tie-break.
CREATE INDEX IF NOT EXISTS items_due_idx ON items(partition, due_at, item_id);

PRAGMA user_version = 1;
";
