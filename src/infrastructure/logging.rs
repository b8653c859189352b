//! File logging bootstrap. Initialization happens at most once per process;
//! repeat calls are no-ops so library consumers and the CLI can both call it
//! safely.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;
use std::path::Path;

const LOG_FILE_BASENAME: &str = "citadel";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGING: OnceCell<LoggerHandle> = OnceCell::new();

/// Starts rotating file logs under `logs_dir`. The level comes from
/// `RUST_LOG` when set, defaulting to `info`.
pub fn init_logging(logs_dir: &Path) -> Result<(), String> {
    if LOGGING.get().is_some() {
        return Ok(());
    }

    let logger = Logger::try_with_env_or_str("info")
        .map_err(|error| format!("invalid log specification: {error}"))?
        .log_to_file(
            FileSpec::default()
                .directory(logs_dir)
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .start()
        .map_err(|error| format!("failed to start logger: {error}"))?;

    let _ = LOGGING.set(logger);
    Ok(())
}
