use std::process::ExitCode;

fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only program output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    playground_lib::run()
}
