//! Configuration for the dump and restore tools.
//!
//! Configs are built with `new` plus `with_*` setters, or from parsed
//! command-line arguments with `from_args`, which performs all usage
//! validation before any network activity.

use crate::args::ParsedArgs;
use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Default server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5984;

/// Options of the dump tool that take a value.
pub const DUMP_VALUE_OPTIONS: &[&str] = &["H", "p", "d"];

/// Options of the restore tool that take a value.
pub const RESTORE_VALUE_OPTIONS: &[&str] = &["H", "p", "d", "f"];

const HOST_PORT_USAGE: &str =
    "Please specify valid hostname and port (-H <HOSTNAME> and -p <PORT>).";
const DATABASE_USAGE: &str = "Please specify database name (-d <DATABASE>).";
const FILE_USAGE: &str = "Please specify JSON file to restore (-f <FILENAME>).";

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server hostname or IP.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Database name.
    pub database: String,
}

impl ConnectionConfig {
    /// Creates a configuration for `database` on the default host and port.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: database.into(),
        }
    }

    /// Sets the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Reads `-H`, `-p` and `-d` and validates them.
    pub fn from_args(args: &ParsedArgs) -> CoreResult<Self> {
        let host = args.value("H")?.map(str::trim).unwrap_or(DEFAULT_HOST);
        let port = match args.value("p")? {
            Some(raw) => parse_port(raw)?,
            None => DEFAULT_PORT,
        };
        let database = args.value("d")?.unwrap_or_default();

        let config = Self::new(database).with_host(host).with_port(port);
        config.validate()?;
        Ok(config)
    }

    /// Checks that host and database are non-empty and the port is usable.
    pub fn validate(&self) -> CoreResult<()> {
        if self.host.trim().is_empty() || self.port == 0 {
            return Err(CoreError::usage(HOST_PORT_USAGE));
        }
        if self.database.is_empty() {
            return Err(CoreError::usage(DATABASE_USAGE));
        }
        Ok(())
    }

    /// Returns `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the server root URL without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.address())
    }

    /// Returns the database URL with a trailing slash.
    pub fn database_url(&self) -> String {
        format!(
            "{}/{}/",
            self.base_url(),
            urlencoding::encode(&self.database)
        )
    }
}

fn parse_port(raw: &str) -> CoreResult<u16> {
    raw.trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| CoreError::usage(HOST_PORT_USAGE))
}

/// Configuration for a dump run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Source database.
    pub connection: ConnectionConfig,
}

impl DumpConfig {
    /// Creates a dump configuration.
    pub fn new(connection: ConnectionConfig) -> Self {
        Self { connection }
    }

    /// Builds and validates a configuration from parsed arguments.
    pub fn from_args(args: &ParsedArgs) -> CoreResult<Self> {
        Ok(Self::new(ConnectionConfig::from_args(args)?))
    }
}

/// Configuration for a restore run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreConfig {
    /// Target database.
    pub connection: ConnectionConfig,
    /// Dump file to post.
    pub file: PathBuf,
    /// Drop and recreate the database if it exists.
    pub drop: bool,
    /// Restore even if the database already holds documents.
    pub force: bool,
}

impl RestoreConfig {
    /// Creates a restore configuration with both flags off.
    pub fn new(connection: ConnectionConfig, file: impl Into<PathBuf>) -> Self {
        Self {
            connection,
            file: file.into(),
            drop: false,
            force: false,
        }
    }

    /// Sets the drop flag.
    pub fn with_drop(mut self, drop: bool) -> Self {
        self.drop = drop;
        self
    }

    /// Sets the force flag.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Builds and validates a configuration from parsed arguments.
    ///
    /// The dump file must be an existing regular file that can be opened
    /// for reading.
    pub fn from_args(args: &ParsedArgs) -> CoreResult<Self> {
        let connection = ConnectionConfig::from_args(args)?;
        let file = args
            .value("f")?
            .filter(|path| is_readable_file(Path::new(path)))
            .ok_or_else(|| CoreError::usage(FILE_USAGE))?;

        Ok(Self::new(connection, file)
            .with_drop(args.is_enabled("D"))
            .with_force(args.is_enabled("F")))
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}
