//! Dumps a CouchDB database to stdout.

use couchdump_cli::commands::{dump, process_args};
use std::process::ExitCode;

fn main() -> ExitCode {
    ExitCode::from(dump::run(&process_args()).code())
}
