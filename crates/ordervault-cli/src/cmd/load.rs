use anyhow::Result;
use clap::Args;
use ordervault_core::config::Config;
use ordervault_core::error::ErrorCode;
use ordervault_core::loader::OrderLoader;
use ordervault_core::queue::JsonlTopic;

use crate::output::{OutputMode, render, text_kv};

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Maximum messages to take from the inbound topic in this run.
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Execute `ovault load`: one batch loader run over the inbound topic.
///
/// # Errors
///
/// Returns an error if the store, topics or lock are unavailable, or if the
/// run ends on a store, queue or (under `abort`) malformed-event failure.
pub fn run_load(args: &LoadArgs, mut config: Config, output: OutputMode) -> Result<()> {
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be positive");
        config.loader.batch_size = batch_size;
    }

    let conn = super::open_store(&config, output)?;
    let mut orders = JsonlTopic::open(&config.queue.dir, &config.queue.order_topic)
        .map_err(|err| super::fail(output, err, ErrorCode::QueueReadFailed))?;
    let _lock = super::lock_topic(orders.lock_path(), &config, output)?;
    let mut summaries = JsonlTopic::open(&config.queue.dir, &config.queue.summary_topic)
        .map_err(|err| super::fail(output, err, ErrorCode::QueuePublishFailed))?;

    let report = OrderLoader::new(&conn, &mut orders, &mut summaries, config.loader)
        .run()
        .map_err(|err| {
            let code = err.code();
            super::fail(output, err, code)
        })?;

    render(output, &report, |r, w| {
        text_kv(w, "fetched", r.fetched)?;
        text_kv(w, "skipped", r.skipped)?;
        text_kv(w, "loaded", r.loaded)?;
        text_kv(w, "malformed", r.malformed)?;
        text_kv(w, "published", r.published)
    })
}
