//! laneline - lane-based day timeline with push-reflow scheduling

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = laneline::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
