//! Database restore.
//!
//! Posts a dump file to `_bulk_docs` after making sure the target database
//! exists and is safe to write into.

use crate::config::RestoreConfig;
use crate::couch::CouchDb;
use crate::error::{CoreError, CoreResult};
use crate::model::BulkFailure;
use couchdump_http::HttpClient;
use serde_json::Value;
use std::fs;
use tracing::{debug, info, warn};

/// What a restore did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Documents in the target before anything was changed.
    pub existing_doc_count: u64,
    /// The target was deleted first.
    pub dropped: bool,
    /// The target was created.
    pub created: bool,
    /// Documents the bulk write rejected.
    pub failures: Vec<BulkFailure>,
}

impl RestoreReport {
    /// Fails with [`CoreError::DocumentWrites`] if any document was
    /// rejected.
    pub fn ensure_success(&self) -> CoreResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::DocumentWrites {
                count: self.failures.len(),
            })
        }
    }
}

/// Replays a dump file into a database.
pub struct Restorer<C: HttpClient> {
    couch: CouchDb<C>,
    config: RestoreConfig,
}

impl<C: HttpClient> Restorer<C> {
    /// Creates a restorer for the configured database and file.
    pub fn new(client: C, config: RestoreConfig) -> Self {
        Self {
            couch: CouchDb::new(client, config.connection.clone()),
            config,
        }
    }

    /// Runs the restore.
    ///
    /// Per-document failures do not make this fail; they are logged and
    /// returned in the report. See [`RestoreReport::ensure_success`].
    pub fn run(&self) -> CoreResult<RestoreReport> {
        let connection = &self.config.connection;
        let database = &connection.database;
        let mut report = RestoreReport::default();

        info!("Checking db '{database}' at {} ...", connection.address());
        let mut exists = match self.couch.database_info()? {
            Some(info) => {
                info!("Database '{database}' has {} documents.", info.doc_count);
                report.existing_doc_count = info.doc_count;
                true
            }
            None => false,
        };
        let mut doc_count = report.existing_doc_count;

        if self.config.drop && exists {
            info!("Deleting database '{database}'...");
            self.couch.delete_database()?;
            report.dropped = true;
            exists = false;
            doc_count = 0;
        }

        if doc_count > 0 && !self.config.force {
            return Err(CoreError::NonEmptyDatabase {
                database: database.clone(),
                doc_count,
            });
        }

        if !exists {
            info!("Creating database '{database}'...");
            self.couch.create_database()?;
            report.created = true;
        }

        info!(
            "Restoring '{}' into db '{database}' at {} ...",
            self.config.file.display(),
            connection.address()
        );
        let payload = fs::read(&self.config.file)?;
        let response = self.couch.bulk_docs(payload)?;

        report.failures = collect_failures(&response);
        for failure in &report.failures {
            warn!("[{}] = {}", failure.id, failure.reason);
        }
        Ok(report)
    }
}

fn collect_failures(response: &Value) -> Vec<BulkFailure> {
    match response {
        Value::Array(outcomes) => outcomes.iter().filter_map(BulkFailure::from_outcome).collect(),
        other => {
            debug!(response = %other, "bulk response has no per-document outcomes");
            Vec::new()
        }
    }
}
