use log::LevelFilter;

/// Initialize logging for the application.
///
/// Should be called once at the start of `main()`. Tokens and API keys are
/// never passed to the logger by this crate, so the output is safe to ship.
///
/// # Errors
///
/// Returns an error if a global logger has already been installed.
pub fn init_logging(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_initialization_is_rejected() {
        // The first call may lose to another test; the second never succeeds.
        let _ = init_logging(LevelFilter::Debug);
        assert!(init_logging(LevelFilter::Info).is_err());
    }
}
