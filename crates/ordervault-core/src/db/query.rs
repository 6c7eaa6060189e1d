//! Read helpers over the warehouse tables.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;

use super::schema;

/// Row count per warehouse table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarehouseStats {
    pub hubs: BTreeMap<String, u64>,
    pub links: BTreeMap<String, u64>,
    pub satellites: BTreeMap<String, u64>,
    pub counters: BTreeMap<String, u64>,
}

impl WarehouseStats {
    /// Rows across hubs, links and satellites (counters excluded).
    #[must_use]
    pub fn total_rows(&self) -> u64 {
        self.hubs
            .values()
            .chain(self.links.values())
            .chain(self.satellites.values())
            .sum()
    }

    /// Count for a single table, zero when unknown.
    #[must_use]
    pub fn count(&self, table: &str) -> u64 {
        [&self.hubs, &self.links, &self.satellites, &self.counters]
            .into_iter()
            .find_map(|group| group.get(table).copied())
            .unwrap_or(0)
    }
}

/// Count rows in every warehouse table.
///
/// # Errors
///
/// Returns an error if any count query fails.
pub fn warehouse_stats(conn: &Connection) -> Result<WarehouseStats> {
    Ok(WarehouseStats {
        hubs: count_tables(conn, schema::HUB_TABLES)?,
        links: count_tables(conn, schema::LINK_TABLES)?,
        satellites: count_tables(conn, schema::SATELLITE_TABLES)?,
        counters: count_tables(conn, schema::COUNTER_TABLES)?,
    })
}

fn count_tables(conn: &Connection, tables: &[&str]) -> Result<BTreeMap<String, u64>> {
    let mut counts = BTreeMap::new();
    for table in tables {
        // Table names come from the static schema lists, never from input.
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("count rows in {table}"))?;
        counts.insert((*table).to_string(), u64::try_from(count).unwrap_or(0));
    }
    Ok(counts)
}

/// Running order count for one (user, product) pair.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn product_counter(conn: &Connection, user_id: &str, product_id: &str) -> Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT order_cnt FROM user_product_counters WHERE user_id = ?1 AND product_id = ?2",
        [user_id, product_id],
        |row| row.get(0),
    )
    .optional()
    .context("read product counter")
}

/// Running order count for one (user, category) pair.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn category_counter(
    conn: &Connection,
    user_id: &str,
    category_id: &str,
) -> Result<Option<i64>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT order_cnt FROM user_category_counters WHERE user_id = ?1 AND category_id = ?2",
        [user_id, category_id],
        |row| row.get(0),
    )
    .optional()
    .context("read category counter")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn empty_warehouse_has_zero_rows() {
        let conn = db::open_in_memory().expect("db");
        let stats = warehouse_stats(&conn).expect("stats");

        assert_eq!(stats.total_rows(), 0);
        assert_eq!(stats.hubs.len(), schema::HUB_TABLES.len());
        assert_eq!(stats.satellites.len(), schema::SATELLITE_TABLES.len());
        assert_eq!(stats.count("h_user"), 0);
        assert_eq!(stats.count("no_such_table"), 0);
    }

    #[test]
    fn missing_counter_reads_as_none() {
        let conn = db::open_in_memory().expect("db");
        assert_eq!(product_counter(&conn, "u", "p").expect("query"), None);
        assert_eq!(category_counter(&conn, "u", "c").expect("query"), None);
    }
}
