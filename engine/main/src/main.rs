use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// The environment variable holding the filter of the internal tracing output.
const LOG_VARIABLE: &str = "STRATA_LOG";

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_VARIABLE).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match driver::main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
