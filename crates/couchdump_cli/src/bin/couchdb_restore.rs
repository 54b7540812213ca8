//! Restores a CouchDB database from a dump file.

use couchdump_cli::commands::{process_args, restore};
use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(restore::run(&process_args()).code())
}
