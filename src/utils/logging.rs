//! Logging setup for hosts embedding the synthesizer
//!
//! The render path only logs at `trace` and `debug`; chain rebuilds and
//! unknown effect types are the interesting events. Nothing logged ever
//! changes what is rendered.

use std::io::Write;

fn builder() -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info).format(|buf, record| {
        writeln!(
            buf,
            "\r[{} {:5} {}] {}",
            buf.timestamp(),
            record.level(),
            record.module_path().unwrap_or("unknown"),
            record.args()
        )
    });
    builder
}

/// Initialize the logger at INFO with a format that works in raw terminal
/// mode. `RUST_LOG` overrides the level, e.g. `RUST_LOG=wavemix=debug`.
///
/// Panics if a logger is already installed; use [`try_init_logger`] from
/// tests and libraries.
pub fn init_logger() {
    builder().init();
}

/// Like [`init_logger`] but returns an error when a logger already exists
pub fn try_init_logger() -> Result<(), log::SetLoggerError> {
    builder().try_init()
}
