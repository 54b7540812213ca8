//! `couchdb-restore`.

use super::{fail, say};
use crate::help::{restore_banner, restore_help};
use crate::logging;
use couchdump_core::config::RESTORE_VALUE_OPTIONS;
use couchdump_core::{
    parse_args, CoreResult, ExitKind, ParsedArgs, RestoreConfig, RestoreReport, Restorer,
};
use couchdump_http::{HttpClient, HttpConfig, HttpResult, ReqwestClient};
use std::io::{self, Write};
use tracing::info;

/// Runs the restore against the network.
pub fn run(args: &[String]) -> ExitKind {
    let stderr = io::stderr();
    run_with(
        args,
        || ReqwestClient::new(HttpConfig::default()),
        &mut stderr.lock(),
    )
}

/// Runs the restore with an injected client.
///
/// `connect` is only called once the arguments and the dump file are valid.
pub fn run_with<C, F, E>(args: &[String], connect: F, diag: &mut E) -> ExitKind
where
    C: HttpClient,
    F: FnOnce() -> HttpResult<C>,
    E: Write,
{
    say(diag, &restore_banner());
    let parsed = parse_args(args, RESTORE_VALUE_OPTIONS, &[]);
    if parsed.is_set("h") {
        say(diag, &restore_help());
        return ExitKind::Usage;
    }
    logging::init(parsed.is_enabled("e"));

    match execute(&parsed, connect) {
        Ok(_) => {
            info!("DONE!");
            ExitKind::Success
        }
        Err(err) => fail(err),
    }
}

fn execute<C, F>(parsed: &ParsedArgs, connect: F) -> CoreResult<RestoreReport>
where
    C: HttpClient,
    F: FnOnce() -> HttpResult<C>,
{
    let config = RestoreConfig::from_args(parsed)?;
    let client = connect()?;
    let report = Restorer::new(client, config).run()?;
    report.ensure_success()?;
    Ok(report)
}
