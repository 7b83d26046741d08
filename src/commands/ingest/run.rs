use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use crate::cli::{IngestArgs, default_db_path};
use crate::model::{IngestPaths, IngestRunManifest};
use crate::util::{
    ensure_directory, now_utc_string, read_lossy_utf8, utc_compact_string, write_json_pretty,
};

use super::anchors::ArticleExtractor;
use super::batch::{ResumableBatch, list_documents, subtopic_id_for};
use super::cross_refs::resolve_cross_references;
use super::db_setup::{DB_SCHEMA_VERSION, configure_connection, ensure_schema, reset_schema};
use super::pipeline::{admit_document, process_document};
use super::reference::{ReferenceData, ReferenceIndex, load_reference};
use super::report::IngestReport;
use super::store::SqliteStore;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "ingest_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| default_db_path(&cache_root));
    let topics_path = args.source.topics_path();
    let subtopics_path = args.source.subtopics_path();
    let tree_nodes_path = args.source.tree_nodes_path();
    let documents_dir = args.source.documents_dir();

    info!(
        source_root = %args.source.source_root.display(),
        run_id = %run_id,
        checkpoint = %args.checkpoint.as_deref().unwrap_or("-"),
        "starting ingest"
    );

    let data = ReferenceData::read(&topics_path, &subtopics_path, &tree_nodes_path)?;

    let mut connection = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    if args.reset {
        reset_schema(&connection)?;
        info!(path = %db_path.display(), "dropped existing tables");
    }
    ensure_schema(&connection)?;

    let report = ingest_corpus(
        &mut connection,
        &data,
        &documents_dir,
        &args.source.document_extension,
        args.checkpoint.clone(),
    )?;

    let status = if report.persistence_failures.is_empty() {
        "completed"
    } else {
        "completed_with_failures"
    };

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_ingest_command(&args),
        checkpoint: args.checkpoint.clone(),
        reset: args.reset,
        paths: IngestPaths {
            topics_path: topics_path.display().to_string(),
            subtopics_path: subtopics_path.display().to_string(),
            tree_nodes_path: tree_nodes_path.display().to_string(),
            documents_dir: documents_dir.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts: report.counts.clone(),
        persistence_failures: report.persistence_failures,
        warnings: report.warnings,
    };

    write_json_pretty(&ingest_manifest_path, &manifest)?;

    info!(path = %ingest_manifest_path.display(), "wrote ingest run manifest");
    info!(
        documents = manifest.counts.documents_processed,
        articles = manifest.counts.articles_inserted,
        cross_references = manifest.counts.cross_references_inserted,
        failures = manifest.persistence_failures.len(),
        "ingest completed"
    );

    Ok(())
}

/// Both phases over an already prepared database: reference load and per-document
/// extraction first, cross-reference resolution once every document is done.
pub(super) fn ingest_corpus(
    connection: &mut Connection,
    data: &ReferenceData,
    documents_dir: &Path,
    extension: &str,
    checkpoint: Option<String>,
) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let index = ReferenceIndex::build(data);

    {
        let tx = connection.transaction()?;
        load_reference(&SqliteStore::new(&tx), data, &mut report);
        tx.commit()?;
    }

    let documents = list_documents(documents_dir, extension)?;
    report.counts.documents_listed = documents.len();

    let extractor = ArticleExtractor::new()?;
    let mut candidates = Vec::new();
    let mut batch = ResumableBatch::from_checkpoint(documents, checkpoint.clone());

    for filename in batch.by_ref() {
        let subtopic_id = subtopic_id_for(&filename);
        let tx = connection.transaction()?;
        {
            let store = SqliteStore::new(&tx);
            let Some(admitted) =
                admit_document(&store, &index, &filename, subtopic_id, &mut report)
            else {
                report.counts.documents_skipped += 1;
                continue;
            };

            let markup = match read_lossy_utf8(&documents_dir.join(&filename)) {
                Ok(markup) => markup,
                Err(err) => {
                    report.counts.documents_skipped += 1;
                    report.warn(format!("skip {filename}: {err:#}"));
                    continue;
                }
            };

            process_document(
                &store,
                &extractor,
                &admitted,
                &markup,
                &mut candidates,
                &mut report,
            );
        }
        tx.commit()
            .with_context(|| format!("failed to commit {filename}"))?;
        report.counts.documents_processed += 1;
    }

    report.counts.documents_before_checkpoint = batch.skipped();
    if let Some(checkpoint) = checkpoint {
        if !batch.started() {
            report.warn(format!(
                "checkpoint {checkpoint} not found in {}; no documents processed",
                documents_dir.display()
            ));
        }
    }

    {
        let tx = connection.transaction()?;
        resolve_cross_references(&SqliteStore::new(&tx), &candidates, &mut report);
        tx.commit()?;
    }

    Ok(report)
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut parts = vec![
        "phapdien".to_string(),
        "ingest".to_string(),
        "--source-root".to_string(),
        args.source.source_root.display().to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    if let Some(path) = &args.db_path {
        parts.push("--db-path".to_string());
        parts.push(path.display().to_string());
    }
    if let Some(checkpoint) = &args.checkpoint {
        parts.push("--checkpoint".to_string());
        parts.push(checkpoint.clone());
    }
    if args.reset {
        parts.push("--reset".to_string());
    }

    parts.join(" ")
}
