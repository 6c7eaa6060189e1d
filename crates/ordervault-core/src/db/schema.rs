//! Canonical SQLite schema for the ordervault warehouse.
//!
//! - `h_*` hub tables hold one immutable row per business key
//! - `l_*` link tables hold one immutable row per hub pair, with foreign keys
//!   to both hubs
//! - `s_*` satellite tables are append-only, unique on their hashdiff
//! - `user_*_counters` hold the running counts maintained by the counter loader
//! - `warehouse_meta` tracks the applied schema version
//!
//! Timestamps are stored as microseconds since the Unix epoch (`*_us`).

/// Migration v1: hubs, links, satellites, counters and warehouse metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS h_user (
    h_user_pk TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS h_product (
    h_product_pk TEXT PRIMARY KEY,
    product_id TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS h_category (
    h_category_pk TEXT PRIMARY KEY,
    category_name TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS h_restaurant (
    h_restaurant_pk TEXT PRIMARY KEY,
    restaurant_id TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS h_order (
    h_order_pk TEXT PRIMARY KEY,
    order_id TEXT NOT NULL,
    order_dt TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS l_order_product (
    hk_order_product_pk TEXT PRIMARY KEY,
    h_order_pk TEXT NOT NULL REFERENCES h_order(h_order_pk),
    h_product_pk TEXT NOT NULL REFERENCES h_product(h_product_pk),
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS l_product_restaurant (
    hk_product_restaurant_pk TEXT PRIMARY KEY,
    h_product_pk TEXT NOT NULL REFERENCES h_product(h_product_pk),
    h_restaurant_pk TEXT NOT NULL REFERENCES h_restaurant(h_restaurant_pk),
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS l_product_category (
    hk_product_category_pk TEXT PRIMARY KEY,
    h_product_pk TEXT NOT NULL REFERENCES h_product(h_product_pk),
    h_category_pk TEXT NOT NULL REFERENCES h_category(h_category_pk),
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS l_order_user (
    hk_order_user_pk TEXT PRIMARY KEY,
    h_order_pk TEXT NOT NULL REFERENCES h_order(h_order_pk),
    h_user_pk TEXT NOT NULL REFERENCES h_user(h_user_pk),
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS s_user_names (
    h_user_pk TEXT NOT NULL REFERENCES h_user(h_user_pk),
    username TEXT NOT NULL,
    userlogin TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL,
    hk_user_names_hashdiff TEXT NOT NULL UNIQUE,
    PRIMARY KEY (h_user_pk, hk_user_names_hashdiff)
);

CREATE TABLE IF NOT EXISTS s_product_names (
    h_product_pk TEXT NOT NULL REFERENCES h_product(h_product_pk),
    name TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL,
    hk_product_names_hashdiff TEXT NOT NULL UNIQUE,
    PRIMARY KEY (h_product_pk, hk_product_names_hashdiff)
);

CREATE TABLE IF NOT EXISTS s_restaurant_names (
    h_restaurant_pk TEXT NOT NULL REFERENCES h_restaurant(h_restaurant_pk),
    name TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL,
    hk_restaurant_names_hashdiff TEXT NOT NULL UNIQUE,
    PRIMARY KEY (h_restaurant_pk, hk_restaurant_names_hashdiff)
);

CREATE TABLE IF NOT EXISTS s_order_cost (
    h_order_pk TEXT NOT NULL REFERENCES h_order(h_order_pk),
    cost REAL NOT NULL,
    payment TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL,
    hk_order_cost_hashdiff TEXT NOT NULL UNIQUE,
    PRIMARY KEY (h_order_pk, hk_order_cost_hashdiff)
);

CREATE TABLE IF NOT EXISTS s_order_status (
    h_order_pk TEXT NOT NULL REFERENCES h_order(h_order_pk),
    status TEXT NOT NULL,
    load_dt_us INTEGER NOT NULL,
    load_src TEXT NOT NULL,
    hk_order_status_hashdiff TEXT NOT NULL UNIQUE,
    PRIMARY KEY (h_order_pk, hk_order_status_hashdiff)
);

CREATE TABLE IF NOT EXISTS warehouse_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS user_product_counters (
    user_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    product_name TEXT NOT NULL,
    order_cnt INTEGER NOT NULL CHECK (order_cnt >= 0),
    PRIMARY KEY (user_id, product_id)
);

CREATE TABLE IF NOT EXISTS user_category_counters (
    user_id TEXT NOT NULL,
    category_id TEXT NOT NULL,
    category_name TEXT NOT NULL,
    order_cnt INTEGER NOT NULL CHECK (order_cnt >= 0),
    PRIMARY KEY (user_id, category_id)
);

CREATE INDEX IF NOT EXISTS idx_l_order_product_order
    ON l_order_product(h_order_pk);

CREATE INDEX IF NOT EXISTS idx_l_product_category_product
    ON l_product_category(h_product_pk, h_category_pk);

CREATE INDEX IF NOT EXISTS idx_l_order_user_user
    ON l_order_user(h_user_pk);

INSERT OR IGNORE INTO warehouse_meta (id, schema_version) VALUES (1, 1);
";

/// Hub tables in insertion order.
pub const HUB_TABLES: &[&str] = &["h_user", "h_product", "h_category", "h_restaurant", "h_order"];

/// Link tables in insertion order.
pub const LINK_TABLES: &[&str] = &[
    "l_order_product",
    "l_product_restaurant",
    "l_product_category",
    "l_order_user",
];

/// Satellite tables in insertion order.
pub const SATELLITE_TABLES: &[&str] = &[
    "s_user_names",
    "s_product_names",
    "s_restaurant_names",
    "s_order_cost",
    "s_order_status",
];

/// Counter tables maintained from summary events.
pub const COUNTER_TABLES: &[&str] = &["user_product_counters", "user_category_counters"];

/// Indexes expected by read paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_l_order_product_order",
    "idx_l_product_category_product",
    "idx_l_order_user_user",
];

/// Every table a fully migrated warehouse must contain.
pub fn all_tables() -> impl Iterator<Item = &'static str> {
    HUB_TABLES
        .iter()
        .chain(LINK_TABLES)
        .chain(SATELLITE_TABLES)
        .chain(COUNTER_TABLES)
        .copied()
}
