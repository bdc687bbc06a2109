//! Entry point for the `gahp-server` binary.

use std::process::ExitCode;

use gahp_server::LaunchError;

fn main() -> ExitCode {
    match gahp_server::run_server() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

#[expect(
    clippy::print_stderr,
    reason = "telemetry may not be installed when launch fails"
)]
fn report(error: &LaunchError) {
    eprintln!("gahp-server: {error}");
}
