//! # hurlite Main Entry Point
//!
//! Parses the command line, installs logging and runs the scripts.

use hurlite::cmd_args::CommandLineArgs;
use hurlite::{config, App, ExitStatus};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config::get_log_level()
    };
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = match CommandLineArgs::try_parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let status = if e.use_stderr() {
                ExitStatus::OptionsError
            } else {
                ExitStatus::Success
            };
            std::process::exit(status.code());
        }
    };
    init_logging(args.verbose());

    let status = match App::new(args).run() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitStatus::RuntimeError
        }
    };
    std::process::exit(status.code());
}
