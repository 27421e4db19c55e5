use clap::Parser;
use log::error;
use pageshot::cli::Args;
use pageshot::{Capture, ExitStatus};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    // stdout carries the screenshot, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let args = Args::parse();

    let config = args.config();
    let engine = match pageshot::new_engine(config.clone()) {
        Ok(e) => e,
        Err(e) => {
            error!("Failed to start browser: {}", e);
            std::process::exit(ExitStatus::Failure.code());
        }
    };

    let capture = Capture::new(config, args.destination());
    let outcome = capture.run(engine, &args.url, std::io::stdout());
    std::process::exit(outcome.exit_status().code());
}
