//! Running per-user counters fed by summary events.
//!
//! Unlike the vault tables these rows are updated in place:
//! `ON CONFLICT DO UPDATE SET order_cnt = order_cnt + excluded.order_cnt`.
//! Redelivering the same summary counts it twice.

use rusqlite::{Connection, Transaction, TransactionBehavior, params};

use crate::event::SummaryEvent;

const ADD_PRODUCT_ORDERS: &str = "INSERT INTO user_product_counters (user_id, product_id, product_name, order_cnt)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (user_id, product_id) DO UPDATE
     SET order_cnt = user_product_counters.order_cnt + excluded.order_cnt,
         product_name = excluded.product_name";

const ADD_CATEGORY_ORDER: &str = "INSERT INTO user_category_counters (user_id, category_id, category_name, order_cnt)
     VALUES (?1, ?2, ?3, 1)
     ON CONFLICT (user_id, category_id) DO UPDATE
     SET order_cnt = user_category_counters.order_cnt + 1,
         category_name = excluded.category_name";

/// Applies summary events to the counter tables.
pub struct CounterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> CounterRepository<'conn> {
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Apply one summary in a single transaction.
    ///
    /// Each product adds its `order_cnt` to the (user, product) counter.
    /// Each category adds one to the (user, category) counter.
    ///
    /// # Errors
    ///
    /// Returns the first SQLite error; the summary is then not applied at all.
    pub fn apply_summary(&self, summary: &SummaryEvent) -> rusqlite::Result<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let user_id = summary.user_id.to_string();

        {
            let mut stmt = tx.prepare_cached(ADD_PRODUCT_ORDERS)?;
            for ((product_id, name), count) in summary
                .product_id
                .iter()
                .zip(&summary.product_name)
                .zip(&summary.order_cnt)
            {
                stmt.execute(params![user_id, product_id, name, count])?;
            }

            let mut stmt = tx.prepare_cached(ADD_CATEGORY_ORDER)?;
            for (category_id, name) in summary.category_id.iter().zip(&summary.category_name) {
                stmt.execute(params![user_id, category_id, name])?;
            }
        }

        tx.commit()
    }
}
