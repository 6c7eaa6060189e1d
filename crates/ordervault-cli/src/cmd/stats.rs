//! `ovault stats`: row counts per warehouse table.

use std::collections::BTreeMap;
use std::io::{self, Write};

use clap::Args;
use ordervault_core::config::Config;
use ordervault_core::db::query::{self, WarehouseStats};

use crate::output::{OutputMode, render};

#[derive(Args, Debug, Default)]
pub struct StatsArgs {}

/// Execute `ovault stats`.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn run_stats(_args: &StatsArgs, config: &Config, output: OutputMode) -> anyhow::Result<()> {
    let conn = super::open_store(config, output)?;
    let stats = query::warehouse_stats(&conn)?;
    render(output, &stats, render_text)
}

fn render_text(stats: &WarehouseStats, w: &mut dyn Write) -> io::Result<()> {
    write_group(w, "hubs", &stats.hubs)?;
    write_group(w, "links", &stats.links)?;
    write_group(w, "satellites", &stats.satellites)?;
    write_group(w, "counters", &stats.counters)?;
    writeln!(w, "total vault rows: {}", stats.total_rows())
}

fn write_group(w: &mut dyn Write, heading: &str, counts: &BTreeMap<String, u64>) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    for (table, count) in counts {
        writeln!(w, "  {table:<24} {count:>8}")?;
    }
    Ok(())
}
