use tracing::warn;

use crate::model::{IngestCounts, PersistenceFailureEntry};

use super::store::PersistenceError;

/// Everything a run dropped, skipped or failed to write, collected instead of printed inline.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub counts: IngestCounts,
    pub persistence_failures: Vec<PersistenceFailureEntry>,
    pub warnings: Vec<String>,
}

impl IngestReport {
    pub fn warn(&mut self, warning: String) {
        warn!(warning = %warning, "ingest warning");
        self.warnings.push(warning);
    }

    pub fn record_failure(&mut self, entity: &str, key: &str, err: &PersistenceError) {
        warn!(entity, key, error = %err, "persistence failure");
        self.persistence_failures.push(PersistenceFailureEntry {
            entity: entity.to_string(),
            key: key.to_string(),
            error: err.to_string(),
        });
    }
}
