use anyhow::{Context as _, Result};
use clap::Args;
use ordervault_core::config::Config;
use ordervault_core::db::migrations;
use serde::Serialize;
use std::path::PathBuf;

use crate::output::{OutputMode, render, text_kv};

#[derive(Args, Debug)]
pub struct InitArgs {}

#[derive(Debug, Serialize)]
struct InitReport {
    store: PathBuf,
    schema_version: u32,
    queue_dir: PathBuf,
}

/// Execute `ovault init`: create the warehouse (migrated to the latest
/// schema) and the queue spool directory. Safe to rerun.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the spool directory
/// cannot be created.
pub fn run_init(_args: &InitArgs, config: &Config, output: OutputMode) -> Result<()> {
    let conn = super::open_store(config, output)?;
    let schema_version =
        migrations::current_schema_version(&conn).context("read warehouse schema version")?;

    std::fs::create_dir_all(&config.queue.dir).with_context(|| {
        format!(
            "Failed to create queue directory: {}",
            config.queue.dir.display()
        )
    })?;

    tracing::info!(store = %config.store.path.display(), schema_version, "warehouse ready");

    let report = InitReport {
        store: config.store.path.clone(),
        schema_version,
        queue_dir: config.queue.dir.clone(),
    };
    render(output, &report, |r, w| {
        text_kv(w, "store", r.store.display())?;
        text_kv(w, "schema", r.schema_version)?;
        text_kv(w, "queue", r.queue_dir.display())
    })
}
