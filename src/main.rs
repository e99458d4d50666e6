//! nested-shell binary entry point.

use std::process::ExitCode;

use nested_shell::{cli, logging, Config, Terminal};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'nested-shell --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }

    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(2);
        }
    };

    logging::init(config.log_filter());
    info!("nested-shell v{}", env!("CARGO_PKG_VERSION"));

    let manager = config.session_manager();
    let mut term = Terminal::stdio();

    match manager.open(&mut term).await {
        Ok(id) => {
            info!("top-most session {} exited", id);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("shell terminated abnormally: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
