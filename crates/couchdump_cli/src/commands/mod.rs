//! The two tools.

pub mod dump;
pub mod restore;

use couchdump_core::CoreError;
use std::io::Write;
use tracing::error;

/// Writes a line of diagnostics, ignoring failures to do so.
fn say<E: Write>(diag: &mut E, text: &str) {
    let _ = writeln!(diag, "{text}");
}

/// Logs a failure and maps it to an exit category.
fn fail(err: CoreError) -> couchdump_core::ExitKind {
    error!("{err}");
    err.exit_kind()
}

/// Collects process arguments without the program name.
pub fn process_args() -> Vec<String> {
    std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}
