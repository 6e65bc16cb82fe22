pub mod actors;
pub mod app_state;
pub mod backend;
pub mod cli;
pub mod code_runner;
pub mod commands;
pub mod error;
pub mod protocol;
pub mod result_formatter;
pub mod settings;
pub mod share;
pub mod test_runner;
pub mod validation;

#[cfg(test)]
mod tests;

use clap::Parser;
use std::process::ExitCode;
use tracing::error;

use cli::{apply_cli_overrides, CliArgs};
use commands::ExitStatus;
use settings::{load_settings, load_settings_from};

pub fn run() -> ExitCode {
    let args = CliArgs::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("❌ Failed to start async runtime: {}", e);
            return ExitStatus::Failure.into();
        }
    };

    let status = runtime.block_on(async {
        let mut settings = match &args.config_path {
            Some(path) => load_settings_from(path).await,
            None => load_settings().await,
        };
        apply_cli_overrides(&args, &mut settings);

        if let Err(e) = settings.validate() {
            eprintln!("❌ {}", e);
            return ExitStatus::Invalid;
        }

        match commands::dispatch(&args, settings).await {
            Ok(status) => status,
            Err(e) => {
                error!(error = %e, "command failed");
                eprintln!("❌ {}", e);
                ExitStatus::Failure
            }
        }
    });

    // Don't block exit on a pending stdin read
    runtime.shutdown_background();
    status.into()
}
