use anyhow::Result;
use clap::Args;
use ordervault_core::config::Config;
use ordervault_core::error::ErrorCode;
use ordervault_core::loader::CounterLoader;
use ordervault_core::queue::JsonlTopic;

use crate::output::{OutputMode, render, text_kv};

#[derive(Args, Debug)]
pub struct CountArgs {
    /// Maximum summaries to take from the summary topic in this run.
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Execute `ovault count`: one counter loader run over the summary topic.
///
/// # Errors
///
/// Returns an error if the store, topic or lock are unavailable, or if the
/// run ends on a failure.
pub fn run_count(args: &CountArgs, mut config: Config, output: OutputMode) -> Result<()> {
    if let Some(batch_size) = args.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be positive");
        config.counter.batch_size = batch_size;
    }

    let conn = super::open_store(&config, output)?;
    let mut summaries = JsonlTopic::open(&config.queue.dir, &config.queue.summary_topic)
        .map_err(|err| super::fail(output, err, ErrorCode::QueueReadFailed))?;
    let _lock = super::lock_topic(summaries.lock_path(), &config, output)?;

    let report = CounterLoader::new(&conn, &mut summaries, config.counter)
        .run()
        .map_err(|err| {
            let code = err.code();
            super::fail(output, err, code)
        })?;

    render(output, &report, |r, w| {
        text_kv(w, "fetched", r.fetched)?;
        text_kv(w, "applied", r.applied)?;
        text_kv(w, "malformed", r.malformed)
    })
}
