mod commands;
mod config;
mod main_lib;

use std::process::ExitCode;

use clap::Parser;
use terra_core::CancellationToken;
use terra_services::Error;

use commands::Cli;
use config::Config;
use main_lib::{build_services, init_tracing};

/// Conventional exit status for a process stopped by SIGINT.
const EXIT_CANCELLED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let cancel = CancellationToken::new();
        let services = build_services(&config, cancel.clone())?;

        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling the current operation");
                on_interrupt.cancel();
            }
        });

        let result = commands::run(cli.command, &services).await;
        Ok::<_, anyhow::Error>(report(result))
    })
}

/// Prints the outcome and picks the exit status. A job that outlived its poll budget
/// is not a failure.
fn report(result: terra_services::Result<String>) -> ExitCode {
    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e @ Error::StillRunning { .. }) => {
            eprintln!("Notice: {}", e);
            ExitCode::SUCCESS
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("Cancelled.");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
