use std::sync::Once;

use env_logger::Builder;
use log::LevelFilter;

static INIT: Once = Once::new();

/// Install the process-wide logger. Safe to call more than once.
pub fn initialize_logger() {
    INIT.call_once_force(|_| {
        let mut builder = Builder::new();

        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("keeldb", LevelFilter::Info)
            .filter_module("keeldb::storage::buffer", LevelFilter::Info)
            .filter_module("keeldb::transaction", LevelFilter::Info)
            .format_timestamp_millis()
            .parse_default_env();

        // Another logger may already be installed (tests, embedding apps).
        let _ = builder.try_init();
    });
}
