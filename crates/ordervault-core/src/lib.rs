//! ordervault-core library.
//!
//! Turns order-lifecycle events into Data Vault hubs, links and satellites,
//! persists them with conflict-safe upserts, and republishes a per-order
//! summary for the counter stage.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams, `anyhow::Result`
//!   for store bootstrap and configuration plumbing.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod db;
pub mod error;
pub mod event;
pub mod key;
pub mod loader;
pub mod lock;
pub mod queue;
pub mod vault;
