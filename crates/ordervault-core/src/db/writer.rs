//! Conflict-safe persistence of decomposed entity sets.
//!
//! Hubs and links are inserted with `ON CONFLICT(<key>) DO NOTHING` on their
//! surrogate key; satellites with `ON CONFLICT(<hashdiff>) DO NOTHING`. The
//! first writer of a key wins and later identical keys are no-ops. Rows are
//! never updated or deleted here.
//!
//! Only the named key conflict is absorbed. Any other constraint failure
//! (foreign key, `NOT NULL`, a trigger abort) is returned as an error.
//!
//! # Atomicity
//!
//! One entity set is written inside a single `IMMEDIATE` transaction: hubs
//! first, then links, then satellites. If any statement fails, the
//! transaction is rolled back on drop and none of the event's rows persist.

use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use serde::Serialize;

use crate::vault::{EntitySet, Hubs, Links, Satellites};

const INSERT_H_USER: &str = "INSERT INTO h_user (h_user_pk, user_id, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (h_user_pk) DO NOTHING";

const INSERT_H_PRODUCT: &str = "INSERT INTO h_product (h_product_pk, product_id, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (h_product_pk) DO NOTHING";

const INSERT_H_CATEGORY: &str = "INSERT INTO h_category (h_category_pk, category_name, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (h_category_pk) DO NOTHING";

const INSERT_H_RESTAURANT: &str = "INSERT INTO h_restaurant (h_restaurant_pk, restaurant_id, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (h_restaurant_pk) DO NOTHING";

const INSERT_H_ORDER: &str = "INSERT INTO h_order (h_order_pk, order_id, order_dt, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (h_order_pk) DO NOTHING";

const INSERT_L_ORDER_PRODUCT: &str = "INSERT INTO l_order_product (hk_order_product_pk, h_order_pk, h_product_pk, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_order_product_pk) DO NOTHING";

const INSERT_L_PRODUCT_RESTAURANT: &str = "INSERT INTO l_product_restaurant (hk_product_restaurant_pk, h_product_pk, h_restaurant_pk, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_product_restaurant_pk) DO NOTHING";

const INSERT_L_PRODUCT_CATEGORY: &str = "INSERT INTO l_product_category (hk_product_category_pk, h_product_pk, h_category_pk, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_product_category_pk) DO NOTHING";

const INSERT_L_ORDER_USER: &str = "INSERT INTO l_order_user (hk_order_user_pk, h_order_pk, h_user_pk, load_dt_us, load_src)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_order_user_pk) DO NOTHING";

const INSERT_S_USER_NAMES: &str = "INSERT INTO s_user_names (h_user_pk, username, userlogin, load_dt_us, load_src, hk_user_names_hashdiff)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (hk_user_names_hashdiff) DO NOTHING";

const INSERT_S_PRODUCT_NAMES: &str = "INSERT INTO s_product_names (h_product_pk, name, load_dt_us, load_src, hk_product_names_hashdiff)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_product_names_hashdiff) DO NOTHING";

const INSERT_S_RESTAURANT_NAMES: &str = "INSERT INTO s_restaurant_names (h_restaurant_pk, name, load_dt_us, load_src, hk_restaurant_names_hashdiff)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_restaurant_names_hashdiff) DO NOTHING";

const INSERT_S_ORDER_COST: &str = "INSERT INTO s_order_cost (h_order_pk, cost, payment, load_dt_us, load_src, hk_order_cost_hashdiff)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT (hk_order_cost_hashdiff) DO NOTHING";

const INSERT_S_ORDER_STATUS: &str = "INSERT INTO s_order_status (h_order_pk, status, load_dt_us, load_src, hk_order_status_hashdiff)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT (hk_order_status_hashdiff) DO NOTHING";

// ---------------------------------------------------------------------------
// WriteStats
// ---------------------------------------------------------------------------

/// Row outcome counts for one written entity set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteStats {
    /// Rows that did not exist before.
    pub inserted: usize,
    /// Rows whose key or hashdiff was already stored.
    pub unchanged: usize,
}

impl WriteStats {
    fn record(&mut self, changed: usize) {
        if changed == 0 {
            self.unchanged += 1;
        } else {
            self.inserted += changed;
        }
    }

    /// Total statements issued.
    #[must_use]
    pub const fn statements(&self) -> usize {
        self.inserted + self.unchanged
    }
}

// ---------------------------------------------------------------------------
// VaultWriter
// ---------------------------------------------------------------------------

/// Persists [`EntitySet`]s into the warehouse.
pub struct VaultWriter<'conn> {
    conn: &'conn Connection,
}

impl<'conn> VaultWriter<'conn> {
    /// Create a writer backed by the given connection.
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Write one event's entity set atomically.
    ///
    /// # Errors
    ///
    /// Returns the first SQLite error encountered. Nothing from this entity
    /// set is persisted when an error is returned.
    pub fn write(&self, set: &EntitySet) -> rusqlite::Result<WriteStats> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut stats = WriteStats::default();

        insert_hubs(&tx, &set.hubs, &mut stats)?;
        insert_links(&tx, &set.links, &mut stats)?;
        insert_satellites(&tx, &set.satellites, &mut stats)?;

        tx.commit()?;
        Ok(stats)
    }
}

fn insert_hubs(conn: &Connection, hubs: &Hubs, stats: &mut WriteStats) -> rusqlite::Result<()> {
    let user = &hubs.user;
    stats.record(conn.prepare_cached(INSERT_H_USER)?.execute(params![
        user.h_user_pk,
        user.user_id,
        user.load_dt.timestamp_micros(),
        user.load_src,
    ])?);

    let mut stmt = conn.prepare_cached(INSERT_H_PRODUCT)?;
    for product in &hubs.products {
        stats.record(stmt.execute(params![
            product.h_product_pk,
            product.product_id,
            product.load_dt.timestamp_micros(),
            product.load_src,
        ])?);
    }

    let mut stmt = conn.prepare_cached(INSERT_H_CATEGORY)?;
    for category in &hubs.categories {
        stats.record(stmt.execute(params![
            category.h_category_pk,
            category.category_name,
            category.load_dt.timestamp_micros(),
            category.load_src,
        ])?);
    }

    let restaurant = &hubs.restaurant;
    stats.record(conn.prepare_cached(INSERT_H_RESTAURANT)?.execute(params![
        restaurant.h_restaurant_pk,
        restaurant.restaurant_id,
        restaurant.load_dt.timestamp_micros(),
        restaurant.load_src,
    ])?);

    let order = &hubs.order;
    stats.record(conn.prepare_cached(INSERT_H_ORDER)?.execute(params![
        order.h_order_pk,
        order.order_id,
        order.order_dt,
        order.load_dt.timestamp_micros(),
        order.load_src,
    ])?);

    Ok(())
}

fn insert_links(conn: &Connection, links: &Links, stats: &mut WriteStats) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(INSERT_L_ORDER_PRODUCT)?;
    for link in &links.order_products {
        stats.record(stmt.execute(params![
            link.hk_order_product_pk,
            link.h_order_pk,
            link.h_product_pk,
            link.load_dt.timestamp_micros(),
            link.load_src,
        ])?);
    }

    let mut stmt = conn.prepare_cached(INSERT_L_PRODUCT_RESTAURANT)?;
    for link in &links.product_restaurants {
        stats.record(stmt.execute(params![
            link.hk_product_restaurant_pk,
            link.h_product_pk,
            link.h_restaurant_pk,
            link.load_dt.timestamp_micros(),
            link.load_src,
        ])?);
    }

    let mut stmt = conn.prepare_cached(INSERT_L_PRODUCT_CATEGORY)?;
    for link in &links.product_categories {
        stats.record(stmt.execute(params![
            link.hk_product_category_pk,
            link.h_product_pk,
            link.h_category_pk,
            link.load_dt.timestamp_micros(),
            link.load_src,
        ])?);
    }

    let link = &links.order_user;
    stats.record(conn.prepare_cached(INSERT_L_ORDER_USER)?.execute(params![
        link.hk_order_user_pk,
        link.h_order_pk,
        link.h_user_pk,
        link.load_dt.timestamp_micros(),
        link.load_src,
    ])?);

    Ok(())
}

fn insert_satellites(
    conn: &Connection,
    satellites: &Satellites,
    stats: &mut WriteStats,
) -> rusqlite::Result<()> {
    let names = &satellites.user_names;
    stats.record(conn.prepare_cached(INSERT_S_USER_NAMES)?.execute(params![
        names.h_user_pk,
        names.username,
        names.userlogin,
        names.load_dt.timestamp_micros(),
        names.load_src,
        names.hk_user_names_hashdiff,
    ])?);

    let mut stmt = conn.prepare_cached(INSERT_S_PRODUCT_NAMES)?;
    for names in &satellites.product_names {
        stats.record(stmt.execute(params![
            names.h_product_pk,
            names.name,
            names.load_dt.timestamp_micros(),
            names.load_src,
            names.hk_product_names_hashdiff,
        ])?);
    }

    let names = &satellites.restaurant_names;
    stats.record(conn.prepare_cached(INSERT_S_RESTAURANT_NAMES)?.execute(params![
        names.h_restaurant_pk,
        names.name,
        names.load_dt.timestamp_micros(),
        names.load_src,
        names.hk_restaurant_names_hashdiff,
    ])?);

    let cost = &satellites.order_cost;
    stats.record(conn.prepare_cached(INSERT_S_ORDER_COST)?.execute(params![
        cost.h_order_pk,
        cost.cost,
        cost.payment,
        cost.load_dt.timestamp_micros(),
        cost.load_src,
        cost.hk_order_cost_hashdiff,
    ])?);

    let status = &satellites.order_status;
    stats.record(conn.prepare_cached(INSERT_S_ORDER_STATUS)?.execute(params![
        status.h_order_pk,
        status.status,
        status.load_dt.timestamp_micros(),
        status.load_src,
        status.hk_order_status_hashdiff,
    ])?);

    Ok(())
}
