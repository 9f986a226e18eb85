use clap::Parser;
use log::LevelFilter;

use cancelguard::app::{App, EXIT_CANCELLED};
use cancelguard::cli::Cli;
use cancelguard::config::InterruptConfig;
use cancelguard::guard::InterruptGuard;
use cancelguard::signal::NixSignals;

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity flags
    let log_level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    // Policy from environment, then CLI overrides, then what stdin allows
    let config = InterruptConfig::from_env()
        .with_overrides(cli.interrupt)
        .resolve_for_stdin();

    let Some(signals) = NixSignals::claim() else {
        log::error!("SIGINT handling is already claimed in this process");
        std::process::exit(1);
    };
    let mut app = App::new(InterruptGuard::new(signals, config.policy));

    let report = match app.run(&cli.command) {
        Ok(report) => report,
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    };

    match report.render(cli.format) {
        Ok(text) => println!("{}", text),
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }

    if report.is_cancelled() {
        std::process::exit(EXIT_CANCELLED);
    }
}
