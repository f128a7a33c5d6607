//! Minimal stderr backend for the `log` facade.
//!
//! The library only emits through `log::*` macros; the binary installs this
//! logger so progress goes to stderr while reports stay on stdout.

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Map `-v` count and `--quiet` onto a level.
pub fn level_from_flags(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. Later calls only adjust the level.
pub fn init(level: LevelFilter) {
    // Fails only if a logger is already installed, which is fine.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_levels() {
        assert_eq!(level_from_flags(0, false), LevelFilter::Warn);
        assert_eq!(level_from_flags(2, false), LevelFilter::Debug);
        assert_eq!(level_from_flags(7, false), LevelFilter::Trace);
        assert_eq!(level_from_flags(3, true), LevelFilter::Error);
    }
}
