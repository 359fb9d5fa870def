//! Logging utilities

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second initialisation (e.g. from several tests) is harmless.
    let _ = env_logger::try_init();
}

/// Initialize the logging system with an explicit filter such as `"scene_engine=debug"`
pub fn init_with_filter(filter: &str) {
    let _ = env_logger::Builder::new()
        .parse_filters(filter)
        .try_init();
}
