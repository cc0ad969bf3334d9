//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```
/// verdure::core::logging::init();
/// log::info!("Vegetation field ready");
/// ```
pub fn init() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_init_twice_is_harmless() {
        super::init();
        super::init();
        log::debug!("logger installed");
    }
}
