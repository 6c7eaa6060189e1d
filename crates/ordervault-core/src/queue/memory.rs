use std::collections::VecDeque;

use serde_json::Value;

use super::{MessageSink, MessageSource, QueueError};

/// In-process FIFO topic implementing both [`MessageSource`] and [`MessageSink`].
///
/// Consumed messages stay in flight until [`MessageSource::ack`];
/// [`MemoryQueue::redeliver`] puts unacknowledged ones back at the front, the
/// way a broker would after a consumer crash.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    topic: String,
    messages: VecDeque<Value>,
    in_flight: Vec<Value>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            messages: VecDeque::new(),
            in_flight: Vec::new(),
        }
    }

    /// Build a topic pre-loaded with `messages`, consumed front to back.
    #[must_use]
    pub fn with_messages(
        topic: impl Into<String>,
        messages: impl IntoIterator<Item = Value>,
    ) -> Self {
        Self {
            topic: topic.into(),
            messages: messages.into_iter().collect(),
            in_flight: Vec::new(),
        }
    }

    /// Messages not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages consumed but not yet acknowledged.
    #[must_use]
    pub fn unacked(&self) -> usize {
        self.in_flight.len()
    }

    /// Return unacknowledged messages to the front of the queue, in order.
    pub fn redeliver(&mut self) {
        for message in self.in_flight.drain(..).rev() {
            self.messages.push_front(message);
        }
    }

    /// Messages still queued, front first.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.messages.iter()
    }
}

impl MessageSource for MemoryQueue {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn consume(&mut self) -> Result<Option<Value>, QueueError> {
        let next = self.messages.pop_front();
        if let Some(message) = &next {
            self.in_flight.push(message.clone());
        }
        Ok(next)
    }

    fn ack(&mut self) -> Result<(), QueueError> {
        self.in_flight.clear();
        Ok(())
    }
}

impl MessageSink for MemoryQueue {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn produce(&mut self, message: &Value) -> Result<(), QueueError> {
        self.messages.push_back(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn consumes_in_fifo_order() {
        let mut queue = MemoryQueue::with_messages("orders", [json!(1), json!(2)]);
        assert_eq!(queue.consume().expect("consume"), Some(json!(1)));
        assert_eq!(queue.consume().expect("consume"), Some(json!(2)));
        assert_eq!(queue.consume().expect("consume"), None);
    }

    #[test]
    fn produced_messages_can_be_consumed() {
        let mut queue = MemoryQueue::new("summaries");
        queue.produce(&json!({"n": 1})).expect("produce");
        assert_eq!(queue.len(), 1);
        assert_eq!(MessageSink::topic(&queue), "summaries");
        assert_eq!(queue.consume().expect("consume"), Some(json!({"n": 1})));
        assert!(queue.is_empty());
    }

    #[test]
    fn unacked_messages_are_redelivered_in_order() {
        let mut queue = MemoryQueue::with_messages("orders", [json!(1), json!(2), json!(3)]);
        queue.consume().expect("consume");
        queue.ack().expect("ack");
        queue.consume().expect("consume");
        queue.consume().expect("consume");
        assert_eq!(queue.unacked(), 2);

        queue.redeliver();
        assert_eq!(queue.unacked(), 0);
        let rest: Vec<_> = queue.iter().cloned().collect();
        assert_eq!(rest, vec![json!(2), json!(3)]);
    }
}
