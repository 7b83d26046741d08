use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use crate::cli::{ValidateArgs, default_db_path};
use crate::model::{InvariantSummary, ValidationReport};
use crate::util::{now_utc_string, write_json_pretty};

pub fn run(args: ValidateArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&args.cache_root));
    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join("validation_report.json")
    });

    let connection = Connection::open_with_flags(
        &db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))?;

    let invariants = collect_invariants(&connection)?;
    let violations = invariants.violation_count();

    if invariants.fallback_chapter_assignments > 0 {
        warn!(
            articles = invariants.fallback_chapter_assignments,
            "articles attached to a chapter by fallback rather than code prefix"
        );
    }

    let report = ValidationReport {
        manifest_version: 1,
        generated_at: now_utc_string(),
        db_path: db_path.display().to_string(),
        status: if violations == 0 { "pass" } else { "fail" }.to_string(),
        invariants,
    };
    write_json_pretty(&report_path, &report)?;
    info!(path = %report_path.display(), status = %report.status, "wrote validation report");

    if violations > 0 {
        bail!("{violations} structural invariant violation(s); see {}", report_path.display());
    }

    Ok(())
}

pub fn collect_invariants(connection: &Connection) -> Result<InvariantSummary> {
    Ok(InvariantSummary {
        subtopics_missing_topic: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM subtopics s
            LEFT JOIN topics t ON t.id = s.topic_id
            WHERE s.topic_id IS NOT NULL
              AND t.id IS NULL
            ",
        )?,
        fallback_chapter_assignments: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM articles a
            JOIN chapters c ON c.code = a.chapter_id
            WHERE c.placeholder = 0
              AND substr(a.code, 1, length(c.code)) <> c.code
            ",
        )?,
        articles_missing_chapter: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM articles a
            LEFT JOIN chapters c ON c.code = a.chapter_id
            WHERE c.code IS NULL
            ",
        )?,
        subtopics_with_multiple_placeholders: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM (
              SELECT subtopic_id
              FROM chapters
              WHERE placeholder = 1
              GROUP BY subtopic_id
              HAVING COUNT(*) > 1
            )
            ",
        )?,
        cross_references_dangling: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM cross_references r
            LEFT JOIN articles a ON a.code = r.article_code_a
            LEFT JOIN articles b ON b.code = r.article_code_b
            WHERE a.code IS NULL
               OR b.code IS NULL
            ",
        )?,
        tables_orphaned: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM article_tables t
            LEFT JOIN articles a ON a.code = t.article_code
            WHERE a.code IS NULL
            ",
        )?,
        files_orphaned: query_violation_count(
            connection,
            "
            SELECT COUNT(*)
            FROM article_files f
            LEFT JOIN articles a ON a.code = f.article_code
            WHERE a.code IS NULL
            ",
        )?,
    })
}

fn query_violation_count(connection: &Connection, sql: &str) -> Result<i64> {
    connection
        .query_row(sql, [], |row| row.get(0))
        .with_context(|| format!("failed to run invariant query: {}", sql.trim()))
}
