use std::path::Path;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::commands::ingest::{ResumableBatch, list_documents, subtopic_id_for};
use crate::model::{DocumentEntry, DocumentInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let documents_dir = args.source.documents_dir();
    let manifest = build_manifest(
        &documents_dir,
        &args.source.document_extension,
        args.checkpoint.clone(),
    )?;

    if args.checkpoint.is_some() && manifest.resumed_document_count == 0 {
        warn!(
            checkpoint = %args.checkpoint.as_deref().unwrap_or_default(),
            "checkpoint does not match any document"
        );
    }

    if args.dry_run {
        info!(
            document_count = manifest.document_count,
            resumed_document_count = manifest.resumed_document_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args.manifest_path.unwrap_or_else(|| {
        args.cache_root
            .join("manifests")
            .join("document_inventory.json")
    });

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        document_count = manifest.document_count,
        resumed_document_count = manifest.resumed_document_count,
        "inventory completed"
    );

    Ok(())
}

/// Every document in processing order, hashed, plus how many a run from `checkpoint` would
/// actually visit.
pub fn build_manifest(
    documents_dir: &Path,
    extension: &str,
    checkpoint: Option<String>,
) -> Result<DocumentInventoryManifest> {
    let filenames = list_documents(documents_dir, extension)?;
    if filenames.is_empty() {
        bail!(
            "no .{extension} documents found in {}",
            documents_dir.display()
        );
    }

    let resumed_document_count =
        ResumableBatch::from_checkpoint(filenames.clone(), checkpoint.clone()).count();

    let mut documents = Vec::with_capacity(filenames.len());
    for filename in filenames {
        let sha256 = sha256_file(&documents_dir.join(&filename))?;
        documents.push(DocumentEntry {
            subtopic_id: subtopic_id_for(&filename).to_string(),
            filename,
            sha256,
        });
    }

    Ok(DocumentInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: documents_dir.display().to_string(),
        checkpoint,
        document_count: documents.len(),
        resumed_document_count,
        documents,
    })
}
