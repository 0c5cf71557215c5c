use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use pulsesync::{Provider, SyncController};
use pulsesync_linux::{
    config::{Config, ConfigError},
    network::InterfaceName,
    observer::{StatusFormat, StatusObserver},
    provider::LinuxProvider,
    setup_logger, LoggerError,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Interface on which to exchange pulses
    interface: InterfaceName,

    /// Set desired logging level
    #[clap(short, long)]
    loglevel: Option<log::LevelFilter>,

    /// Configuration file to use
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// How to print status reports
    #[clap(long, value_enum)]
    status_format: Option<StatusFormat>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logger(#[from] LoggerError),
    #[error(transparent)]
    Transport(#[from] pulsesync::TransportError),
    #[error(transparent)]
    Start(#[from] pulsesync::StartError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(actual_main(args))
}

async fn actual_main(args: Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    let loglevel = args
        .loglevel
        .or(config.loglevel)
        .unwrap_or(log::LevelFilter::Info);
    setup_logger(loglevel)?;

    if !config.check() {
        return Err(ConfigError::Invalid.into());
    }

    let format = args
        .status_format
        .or(config.status_format)
        .unwrap_or_default();

    let provider = Arc::new(LinuxProvider::open(
        &args.interface,
        StatusObserver::new(format),
    )?);

    println!("Own mac address: {}", provider.own_address());

    let _controller = SyncController::start(provider.clone(), config.controller())?;

    match provider.run().await? {}
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn interface_is_required() {
        let error = Args::try_parse_from(["pulsesync"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parse_arguments() {
        let args = Args::try_parse_from([
            "pulsesync",
            "-l",
            "trace",
            "--status-format",
            "json",
            "-c",
            "/etc/pulsesync.toml",
            "eth0",
        ])
        .unwrap();

        assert_eq!(args.interface.as_str(), "eth0");
        assert_eq!(args.loglevel, Some(log::LevelFilter::Trace));
        assert_eq!(args.status_format, Some(StatusFormat::Json));
        assert_eq!(args.config, Some(PathBuf::from("/etc/pulsesync.toml")));
    }

    #[test]
    fn invalid_interface_name() {
        assert!(Args::try_parse_from(["pulsesync", "an-interface-name-too-long"]).is_err());
    }
}
