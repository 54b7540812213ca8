//! `couchdb-dump`.

use super::{fail, say};
use crate::help::{dump_banner, dump_help};
use crate::logging;
use couchdump_core::config::DUMP_VALUE_OPTIONS;
use couchdump_core::{parse_args, CoreResult, DumpConfig, DumpStats, Dumper, ExitKind, ParsedArgs};
use couchdump_http::{HttpClient, HttpConfig, HttpResult, ReqwestClient};
use std::io::{self, Write};

/// Runs the dump against the network, writing the payload to stdout.
pub fn run(args: &[String]) -> ExitKind {
    let stdout = io::stdout();
    let stderr = io::stderr();
    run_with(
        args,
        || ReqwestClient::new(HttpConfig::default()),
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
}

/// Runs the dump with an injected client and streams.
///
/// `connect` is only called once the arguments are valid.
pub fn run_with<C, F, W, E>(args: &[String], connect: F, out: &mut W, diag: &mut E) -> ExitKind
where
    C: HttpClient,
    F: FnOnce() -> HttpResult<C>,
    W: Write,
    E: Write,
{
    say(diag, &dump_banner());
    let parsed = parse_args(args, DUMP_VALUE_OPTIONS, &[]);
    if parsed.is_set("h") {
        say(diag, &dump_help());
        return ExitKind::Usage;
    }
    logging::init(parsed.is_enabled("e"));

    match execute(&parsed, connect, out) {
        Ok(_) => ExitKind::Success,
        Err(err) => fail(err),
    }
}

fn execute<C, F, W>(parsed: &ParsedArgs, connect: F, out: &mut W) -> CoreResult<DumpStats>
where
    C: HttpClient,
    F: FnOnce() -> HttpResult<C>,
    W: Write,
{
    let config = DumpConfig::from_args(parsed)?;
    let client = connect()?;
    Dumper::new(client, config).run(out)
}
