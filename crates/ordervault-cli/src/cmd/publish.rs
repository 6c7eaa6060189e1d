use anyhow::{Context as _, Result};
use clap::Args;
use ordervault_core::config::Config;
use ordervault_core::error::ErrorCode;
use ordervault_core::queue::{JsonlTopic, MessageSink};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::output::{OutputMode, render, text_kv};

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// File with one JSON event per line. Blank lines are ignored.
    pub file: PathBuf,

    /// Topic to append to (defaults to the configured order topic).
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Debug, Serialize)]
struct PublishReport {
    topic: String,
    published: usize,
}

/// Execute `ovault publish`.
///
/// Every line is parsed before anything is appended, so a file with a bad
/// line publishes nothing.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a line is not valid JSON, or
/// the topic cannot be written.
pub fn run_publish(args: &PublishArgs, config: &Config, output: OutputMode) -> Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let messages = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Value>(line)
                .with_context(|| format!("{}:{}: invalid JSON", args.file.display(), i + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    let topic_name = args
        .topic
        .clone()
        .unwrap_or_else(|| config.queue.order_topic.clone());
    let mut topic = JsonlTopic::open(&config.queue.dir, &topic_name)
        .map_err(|err| super::fail(output, err, ErrorCode::QueuePublishFailed))?;

    for message in &messages {
        topic
            .produce(message)
            .map_err(|err| super::fail(output, err, ErrorCode::QueuePublishFailed))?;
    }
    tracing::info!(topic = %topic_name, published = messages.len(), "published events");

    let report = PublishReport {
        topic: topic_name,
        published: messages.len(),
    };
    render(output, &report, |r, w| {
        text_kv(w, "topic", &r.topic)?;
        text_kv(w, "published", r.published)
    })
}
