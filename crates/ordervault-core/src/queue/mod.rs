//! Blocking message queue abstraction.
//!
//! Loaders read from a [`MessageSource`] and publish to a [`MessageSink`].
//! Both calls block until they return or fail; there is no retry here.
//! Delivery is at-least-once: a loader acks a message only after it has been
//! fully handled, so an aborted run re-reads it.
//!
//! Two implementations ship with the crate:
//! - [`MemoryQueue`]: in-process FIFO, used by tests and embedders
//! - [`JsonlTopic`]: durable file-backed topic with a committed offset

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlTopic;
pub use memory::MemoryQueue;

use serde_json::Value;
use std::io;

/// Errors raised by queue reads and publishes.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// I/O failure on the underlying topic storage.
    #[error("queue I/O error on topic {topic}: {source}")]
    Io {
        topic: String,
        #[source]
        source: io::Error,
    },

    /// A stored message is not valid JSON.
    #[error("undecodable message on topic {topic} at offset {offset}: {source}")]
    Decode {
        topic: String,
        offset: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A message could not be encoded for publishing.
    #[error("failed to encode message for topic {topic}: {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The transport refused the operation.
    #[error("topic {topic} unavailable: {reason}")]
    Unavailable { topic: String, reason: String },
}

/// Blocking source of JSON messages.
pub trait MessageSource {
    /// Name of the topic being consumed, used as the default load source tag.
    fn topic(&self) -> &str;

    /// Take the next message, or `None` when the topic is drained.
    ///
    /// # Errors
    ///
    /// Returns a [`QueueError`] when the read fails.
    fn consume(&mut self) -> Result<Option<Value>, QueueError>;

    /// Commit every message consumed so far, so a later run resumes after it.
    ///
    /// Sources without a durable cursor commit on consume and keep the default.
    ///
    /// # Errors
    ///
    /// Returns a [`QueueError`] when the commit cannot be persisted.
    fn ack(&mut self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Blocking sink for JSON messages.
pub trait MessageSink {
    /// Name of the topic being produced to.
    fn topic(&self) -> &str;

    /// Publish one message.
    ///
    /// # Errors
    ///
    /// Returns a [`QueueError`] when the publish fails.
    fn produce(&mut self, message: &Value) -> Result<(), QueueError>;
}

impl<T: MessageSource + ?Sized> MessageSource for &mut T {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    fn consume(&mut self) -> Result<Option<Value>, QueueError> {
        (**self).consume()
    }

    fn ack(&mut self) -> Result<(), QueueError> {
        (**self).ack()
    }
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    fn produce(&mut self, message: &Value) -> Result<(), QueueError> {
        (**self).produce(message)
    }
}
