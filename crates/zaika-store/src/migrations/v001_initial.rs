//! v001 -- Initial schema creation.
//!
//! Creates the four client-state tables: `guest_cart`, `guest_deal`,
//! `area_session` and `auth_session`. Each table is an independent
//! namespace so a shape change in one never invalidates the others.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Guest cart (unauthenticated sessions only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS guest_cart (
    id           TEXT PRIMARY KEY NOT NULL,  -- locally generated UUID v4
    menu_item_id TEXT NOT NULL,
    name         TEXT NOT NULL,
    price        INTEGER NOT NULL,           -- catalog price at snapshot time
    image        TEXT,
    is_available INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    quantity     INTEGER NOT NULL,
    price_at_add INTEGER NOT NULL,           -- immutable once written
    added_at     TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

-- One cart entry per menu item; repeated adds merge into it.
CREATE UNIQUE INDEX IF NOT EXISTS idx_guest_cart_menu_item
    ON guest_cart(menu_item_id);

-- ----------------------------------------------------------------
-- Applied promotional deal (singleton)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS guest_deal (
    id      INTEGER PRIMARY KEY CHECK (id = 1),
    code    TEXT NOT NULL,
    title   TEXT NOT NULL,
    savings INTEGER NOT NULL
);

-- ----------------------------------------------------------------
-- Confirmed delivery area (singleton)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS area_session (
    id               INTEGER PRIMARY KEY CHECK (id = 1),
    area_id          TEXT NOT NULL,
    name             TEXT NOT NULL,
    city             TEXT NOT NULL,
    full_address     TEXT NOT NULL DEFAULT '',
    center_lat       REAL,
    center_lng       REAL,
    delivery_fee     INTEGER NOT NULL,
    min_order_amount INTEGER NOT NULL,
    estimated_time   TEXT NOT NULL,
    user_lat         REAL,                    -- raw location the check ran on
    user_lng         REAL,
    checked_at       TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Auth session (singleton)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS auth_session (
    id       INTEGER PRIMARY KEY CHECK (id = 1),
    token    TEXT NOT NULL,
    user_id  TEXT NOT NULL,
    name     TEXT NOT NULL,
    phone    TEXT,
    email    TEXT,
    saved_at TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
