//! Anvil CLI - run project tasks and their prerequisites

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = anvil_cli::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
