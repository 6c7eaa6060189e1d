use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LoadError;
use crate::config::{CounterConfig, MalformedPolicy};
use crate::db::counters::CounterRepository;
use crate::event::SummaryEvent;
use crate::queue::MessageSource;

/// Outcome counts of one [`CounterLoader::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub fetched: usize,
    pub applied: usize,
    pub malformed: usize,
}

/// Folds summary events into the per-user product and category counters.
pub struct CounterLoader<'conn, S> {
    source: S,
    repo: CounterRepository<'conn>,
    config: CounterConfig,
}

impl<'conn, S: MessageSource> CounterLoader<'conn, S> {
    pub fn new(conn: &'conn Connection, source: S, config: CounterConfig) -> Self {
        Self {
            source,
            repo: CounterRepository::new(conn),
            config,
        }
    }

    /// Process one batch of summary events.
    ///
    /// # Errors
    ///
    /// Returns a queue or store failure, or an invalid summary under
    /// [`MalformedPolicy::Abort`]. The message in hand is not acknowledged.
    pub fn run(&mut self) -> Result<CountReport, LoadError> {
        let topic = self.source.topic().to_string();
        let mut report = CountReport::default();
        tracing::info!(topic = %topic, batch_size = self.config.batch_size, "START");

        while report.fetched < self.config.batch_size {
            let Some(message) = self.source.consume().map_err(LoadError::Consume)? else {
                break;
            };
            report.fetched += 1;

            match self.apply(message) {
                Ok(()) => report.applied += 1,
                Err(err) if err.is_malformed() && self.config.malformed == MalformedPolicy::Skip => {
                    tracing::warn!(topic = %topic, error = %err, "skipping malformed summary event");
                    report.malformed += 1;
                }
                Err(err) => {
                    tracing::error!(topic = %topic, code = %err.code(), error = %err, "count run aborted");
                    return Err(err);
                }
            }

            self.source.ack().map_err(LoadError::Ack)?;
        }

        tracing::info!(
            topic = %topic,
            fetched = report.fetched,
            applied = report.applied,
            malformed = report.malformed,
            "FINISH"
        );
        Ok(report)
    }

    fn apply(&self, message: Value) -> Result<(), LoadError> {
        let summary = SummaryEvent::deserialize(message)
            .map_err(|err| LoadError::InvalidSummary(err.to_string()))?;
        summary
            .check_alignment()
            .map_err(|err| LoadError::InvalidSummary(err.to_string()))?;

        self.repo
            .apply_summary(&summary)
            .map_err(|source| LoadError::Counter {
                user_id: summary.user_id.to_string(),
                source,
            })?;
        tracing::debug!(
            user_id = %summary.user_id,
            products = summary.product_id.len(),
            categories = summary.category_id.len(),
            "applied summary"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, query};
    use crate::error::ErrorCode;
    use crate::key::derive;
    use crate::queue::MemoryQueue;
    use serde_json::json;

    fn summary_message(products: &[(&str, u32)], categories: &[&str]) -> Value {
        json!({
            "user_id": derive("u1"),
            "product_id": products.iter().map(|(id, _)| derive(id)).collect::<Vec<_>>(),
            "product_name": products.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            "category_id": categories.iter().map(|name| derive(name)).collect::<Vec<_>>(),
            "category_name": categories,
            "order_cnt": products.iter().map(|(_, n)| *n).collect::<Vec<_>>(),
        })
    }

    fn config(malformed: MalformedPolicy) -> CounterConfig {
        CounterConfig {
            batch_size: 100,
            malformed,
        }
    }

    #[test]
    fn summaries_accumulate_into_counters() {
        let conn = db::open_in_memory().expect("db");
        let mut summaries = MemoryQueue::with_messages(
            "dds-service-orders",
            [
                summary_message(&[("p1", 2)], &["c1"]),
                summary_message(&[("p1", 1)], &["c1", "c2"]),
            ],
        );

        let report = CounterLoader::new(&conn, &mut summaries, config(MalformedPolicy::Skip))
            .run()
            .expect("run");
        assert_eq!(report.applied, 2);

        let user = derive("u1").to_string();
        let p1 = derive("p1").to_string();
        let c1 = derive("c1").to_string();
        assert_eq!(query::product_counter(&conn, &user, &p1).expect("p1"), Some(3));
        assert_eq!(query::category_counter(&conn, &user, &c1).expect("c1"), Some(2));
    }

    #[test]
    fn misaligned_summary_is_skipped() {
        let conn = db::open_in_memory().expect("db");
        let mut broken = summary_message(&[("p1", 1)], &["c1"]);
        broken["order_cnt"] = json!([]);
        let mut summaries = MemoryQueue::with_messages(
            "dds-service-orders",
            [broken, summary_message(&[("p2", 1)], &[])],
        );

        let report = CounterLoader::new(&conn, &mut summaries, config(MalformedPolicy::Skip))
            .run()
            .expect("run");
        assert_eq!(report.malformed, 1);
        assert_eq!(report.applied, 1);
        assert_eq!(summaries.unacked(), 0);
    }

    #[test]
    fn invalid_summary_aborts_under_abort_policy() {
        let conn = db::open_in_memory().expect("db");
        let mut summaries =
            MemoryQueue::with_messages("dds-service-orders", [json!({"user_id": 7})]);

        let err = CounterLoader::new(&conn, &mut summaries, config(MalformedPolicy::Abort))
            .run()
            .expect_err("abort");
        assert_eq!(err.code(), ErrorCode::InvalidSummary);
        assert_eq!(summaries.unacked(), 1);
    }
}
