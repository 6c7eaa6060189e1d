pub mod count;
pub mod init;
pub mod load;
pub mod publish;
pub mod stats;

use ordervault_core::config::Config;
use ordervault_core::db;
use ordervault_core::error::ErrorCode;
use ordervault_core::lock::RunLock;
use rusqlite::Connection;
use std::path::Path;

use crate::output::{CliError, OutputMode, Reported, render_error};

/// Open the configured warehouse, rendering a coded error on failure.
pub fn open_store(config: &Config, output: OutputMode) -> anyhow::Result<Connection> {
    match db::open_warehouse(&config.store.path, config.store.busy_timeout()) {
        Ok(conn) => Ok(conn),
        Err(err) => {
            render_error(
                output,
                &CliError::with_code(format!("{err:#}"), ErrorCode::StoreOpenFailed),
            )?;
            Err(err.context(Reported))
        }
    }
}

/// Take the run lock guarding consumers of one topic.
pub fn lock_topic(lock_path: &Path, config: &Config, output: OutputMode) -> anyhow::Result<RunLock> {
    match RunLock::acquire(lock_path, config.queue.lock_timeout()) {
        Ok(lock) => Ok(lock),
        Err(err) => {
            let code = err.code();
            Err(fail(output, err, code))
        }
    }
}

/// Render a coded failure to stderr and hand it back, marked as reported,
/// for the exit status.
pub fn fail(
    output: OutputMode,
    err: impl std::error::Error + Send + Sync + 'static,
    code: ErrorCode,
) -> anyhow::Error {
    if let Err(render_err) = render_error(output, &CliError::with_code(err.to_string(), code)) {
        return render_err;
    }
    anyhow::Error::new(err).context(Reported)
}
