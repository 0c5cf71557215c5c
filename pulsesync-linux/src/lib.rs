pub mod clock;
pub mod config;
pub mod network;
pub mod observer;
pub mod provider;

use std::io;

use tracing::level_filters::LevelFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("could not install log bridge: {0}")]
    Bridge(#[from] tracing_log::log_tracer::SetLoggerError),
    #[error("could not install subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

fn level_filter(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

/// Route `log` records of the library and the daemon to stderr.
///
/// Stdout is reserved for the status display.
pub fn setup_logger(level: log::LevelFilter) -> Result<(), LoggerError> {
    tracing_log::LogTracer::builder()
        .with_max_level(level)
        .init()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level_filter(level))
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_mapping() {
        assert_eq!(level_filter(log::LevelFilter::Off), LevelFilter::OFF);
        assert_eq!(level_filter(log::LevelFilter::Info), LevelFilter::INFO);
        assert_eq!(level_filter(log::LevelFilter::Trace), LevelFilter::TRACE);
    }
}
