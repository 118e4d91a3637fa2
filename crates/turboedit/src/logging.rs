//! Logger setup for binaries and tests embedding the engine.
//!
//! Library crates only emit through the `log` facade; installing a logger is
//! left to whoever owns `main`. Both helpers are idempotent.

use log::LevelFilter;

/// Install an `env_logger` at `level`. Returns `false` when a logger was
/// already installed.
pub fn init_logging(level: LevelFilter) -> bool {
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp_millis()
        .format_target(false)
        .try_init()
        .is_ok()
}

/// Install an `env_logger` configured from `RUST_LOG` (default `info`).
pub fn init_logging_from_env() -> bool {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

/// Map a `-v` count to a level: 0 warn, 1 info, 2 debug, 3+ trace.
pub fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
