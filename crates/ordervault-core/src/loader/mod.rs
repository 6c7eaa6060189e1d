//! Batch loaders.
//!
//! [`OrderLoader`] drains up to `batch_size` order events from the inbound
//! topic. Each event goes through the same sequence before the next one is
//! fetched:
//!
//! ```text
//! FETCHING -> FILTERING -> DECOMPOSING -> PERSISTING -> PUBLISHING -> ack
//!     |            |
//!     |            +-- status != CLOSED: ack, back to FETCHING
//!     +-- no message, or batch exhausted: DONE
//! ```
//!
//! A message is acknowledged only once it has been fully handled. A store,
//! publish or queue failure ends the run without acking, so the next run
//! re-reads the message; the idempotent upserts make that replay safe for
//! the warehouse.
//!
//! [`CounterLoader`] is the downstream stage: it folds summary events into
//! the running per-user counters.

pub mod counter;

pub use counter::{CountReport, CounterLoader};

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use crate::config::{LoaderConfig, MalformedPolicy};
use crate::db::writer::VaultWriter;
use crate::error::ErrorCode;
use crate::event::{CLOSED_STATUS, DecomposeError, OrderEvent, SummaryEvent, payload_status};
use crate::queue::{MessageSink, MessageSource, QueueError};
use crate::vault::{LoadContext, decompose};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures that end a loader run.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An order event could not be decomposed.
    #[error("{0}")]
    Malformed(#[from] DecomposeError),

    /// A summary event could not be applied to the counters.
    #[error("malformed summary event: {0}")]
    InvalidSummary(String),

    /// The warehouse rejected an order's entity set; nothing of it persisted.
    #[error("failed to persist order {order_id}: {source}")]
    Store {
        order_id: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The counter tables rejected a summary; nothing of it was applied.
    #[error("failed to apply summary for user {user_id}: {source}")]
    Counter {
        user_id: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read inbound message: {0}")]
    Consume(#[source] QueueError),

    #[error("failed to encode summary for order {order_id}: {source}")]
    Encode {
        order_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to publish summary: {0}")]
    Publish(#[source] QueueError),

    #[error("failed to acknowledge message: {0}")]
    Ack(#[source] QueueError),
}

impl LoadError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(err) => err.code(),
            Self::InvalidSummary(_) => ErrorCode::InvalidSummary,
            Self::Store { .. } | Self::Counter { .. } => ErrorCode::StoreWriteFailed,
            Self::Consume(_) | Self::Ack(_) => ErrorCode::QueueReadFailed,
            Self::Encode { .. } | Self::Publish(_) => ErrorCode::QueuePublishFailed,
        }
    }

    /// Whether the error concerns the message content rather than the
    /// store or the queue. Only these are subject to [`MalformedPolicy`].
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::InvalidSummary(_))
    }
}

// ---------------------------------------------------------------------------
// LoadReport
// ---------------------------------------------------------------------------

/// Outcome counts of one [`OrderLoader::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Messages taken from the inbound topic.
    pub fetched: usize,
    /// Messages whose status is not `CLOSED`.
    pub skipped: usize,
    /// Closed orders persisted to the warehouse.
    pub loaded: usize,
    /// Messages passed over under [`MalformedPolicy::Skip`].
    pub malformed: usize,
    /// Summary events published.
    pub published: usize,
}

enum Outcome {
    Skipped,
    Loaded,
}

// ---------------------------------------------------------------------------
// OrderLoader
// ---------------------------------------------------------------------------

/// Moves closed orders from the inbound topic into the warehouse and
/// publishes one summary per order.
pub struct OrderLoader<'conn, S, K> {
    source: S,
    sink: K,
    writer: VaultWriter<'conn>,
    config: LoaderConfig,
}

impl<'conn, S: MessageSource, K: MessageSink> OrderLoader<'conn, S, K> {
    pub fn new(conn: &'conn Connection, source: S, sink: K, config: LoaderConfig) -> Self {
        Self {
            source,
            sink,
            writer: VaultWriter::new(conn),
            config,
        }
    }

    /// Process one batch.
    ///
    /// # Errors
    ///
    /// Returns the first error that ends the run: a queue or store failure,
    /// or a malformed event under [`MalformedPolicy::Abort`]. The message
    /// being handled when the error occurred is not acknowledged.
    pub fn run(&mut self) -> Result<LoadReport, LoadError> {
        let topic = self.source.topic().to_string();
        let load_src = self.config.source.clone().unwrap_or_else(|| topic.clone());
        let mut report = LoadReport::default();

        tracing::info!(
            topic = %topic,
            sink = %self.sink.topic(),
            batch_size = self.config.batch_size,
            "START"
        );

        while report.fetched < self.config.batch_size {
            let Some(message) = self.source.consume().map_err(LoadError::Consume)? else {
                break;
            };
            report.fetched += 1;

            match self.handle(&message, &load_src) {
                Ok(Outcome::Skipped) => report.skipped += 1,
                Ok(Outcome::Loaded) => {
                    report.loaded += 1;
                    report.published += 1;
                }
                Err(err) if err.is_malformed() && self.config.malformed == MalformedPolicy::Skip => {
                    tracing::warn!(
                        topic = %topic,
                        code = %err.code(),
                        error = %err,
                        "skipping malformed order event"
                    );
                    report.malformed += 1;
                }
                Err(err) => {
                    tracing::error!(topic = %topic, code = %err.code(), error = %err, "load run aborted");
                    return Err(err);
                }
            }

            self.source.ack().map_err(LoadError::Ack)?;
        }

        tracing::info!(
            topic = %topic,
            fetched = report.fetched,
            skipped = report.skipped,
            loaded = report.loaded,
            malformed = report.malformed,
            published = report.published,
            "FINISH"
        );
        Ok(report)
    }

    fn handle(&mut self, message: &Value, load_src: &str) -> Result<Outcome, LoadError> {
        let status = payload_status(message)?;
        if status != CLOSED_STATUS {
            tracing::debug!(status, "skipping order that is not closed");
            return Ok(Outcome::Skipped);
        }

        let event = OrderEvent::from_message(message)?;
        let ctx = LoadContext::new(Utc::now(), load_src);
        let set = decompose(&event, &ctx)?;

        let stats = self.writer.write(&set).map_err(|source| LoadError::Store {
            order_id: event.order.id.clone(),
            source,
        })?;
        tracing::debug!(
            order_id = %event.order.id,
            hubs = set.hub_count(),
            links = set.link_count(),
            satellites = set.satellite_count(),
            inserted = stats.inserted,
            unchanged = stats.unchanged,
            "persisted order"
        );

        let summary = SummaryEvent::from_entities(&set);
        let value = serde_json::to_value(&summary).map_err(|source| LoadError::Encode {
            order_id: event.order.id.clone(),
            source,
        })?;
        self.sink.produce(&value).map_err(LoadError::Publish)?;

        Ok(Outcome::Loaded)
    }
}
