//! Logger initialization.

/// Initializes the process-wide logger.
///
/// Uses `pretty_env_logger` with timestamps; the filter is controlled by
/// `RUST_LOG` and defaults to `info` for the crate.
pub fn init_logger() {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }
    let _ = builder.try_init();
}
