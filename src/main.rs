//! reqo - curl, but with projects & saved calls

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use reqo::cli::{self, Cli, Context};
use reqo::config::Config;
use reqo::ReqoError;

/// Logs go to stderr, or to `--log-file` without ANSI colours.
/// `RUST_LOG` overrides the level picked from `-v`.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(path.as_os_str());
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_deref());

    let ctx = match std::env::current_dir() {
        Ok(cwd) => Context {
            cwd,
            project: cli.project.clone(),
            config_path: Config::default_path(),
        },
        Err(e) => {
            eprintln!("reqo: cannot determine working directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    match cli::dispatch(cli.command, &ctx, &mut stdout).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("reqo: {:#}", e);
            // nothing was sent
            let composition = e
                .downcast_ref::<ReqoError>()
                .is_some_and(ReqoError::is_composition_error);
            ExitCode::from(if composition { 2 } else { 1 })
        }
    }
}
