use std::collections::HashSet;

use tracing::{debug, info};

use crate::model::CrossReference;

use super::report::IngestReport;
use super::store::{Store, UpsertOutcome};

/// Second phase: runs once every document is done, so both endpoints are checked against
/// the final article set regardless of which document was processed first.
pub fn resolve_cross_references(
    store: &dyn Store,
    candidates: &[CrossReference],
    report: &mut IngestReport,
) {
    report.counts.cross_reference_candidates += candidates.len();

    let mut seen = HashSet::new();
    for candidate in candidates {
        if !seen.insert(candidate) {
            continue;
        }

        if !endpoint_exists(store, &candidate.article_code_a, report)
            || !endpoint_exists(store, &candidate.article_code_b, report)
        {
            report.counts.cross_references_discarded += 1;
            debug!(
                from = %candidate.article_code_a,
                to = %candidate.article_code_b,
                "discarding unresolved cross reference"
            );
            continue;
        }

        match store.upsert_cross_reference(candidate) {
            Ok(UpsertOutcome::Inserted) => report.counts.cross_references_inserted += 1,
            Ok(UpsertOutcome::Ignored) => {}
            Err(err) => report.record_failure(
                "cross_reference",
                &format!("{} -> {}", candidate.article_code_a, candidate.article_code_b),
                &err,
            ),
        }
    }

    info!(
        candidates = candidates.len(),
        inserted = report.counts.cross_references_inserted,
        discarded = report.counts.cross_references_discarded,
        "cross references resolved"
    );
}

fn endpoint_exists(store: &dyn Store, code: &str, report: &mut IngestReport) -> bool {
    match store.article_exists(code) {
        Ok(found) => found,
        Err(err) => {
            report.record_failure("article", code, &err);
            false
        }
    }
}
