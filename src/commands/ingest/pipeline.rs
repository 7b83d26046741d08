use tracing::{debug, info};

use crate::model::{Article, ArticleTable, CrossReference, FileAttachment, TreeNode};

use super::anchors::{ArticleExtractor, Extraction};
use super::chapters::resolve_chapters;
use super::document::SourceDocument;
use super::reference::ReferenceIndex;
use super::report::IngestReport;
use super::store::{Store, UpsertOutcome};

/// A document that passed the pre-checks and is worth parsing.
#[derive(Debug)]
pub struct AdmittedDocument<'i> {
    pub filename: String,
    pub subtopic_id: String,
    pub topic_id: String,
    pub nodes: &'i [TreeNode],
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSummary {
    pub chapters: usize,
    pub article_candidates: usize,
    pub articles: usize,
}

/// Checks that a document's subtopic is persisted, maps to a topic and has tree nodes.
pub fn admit_document<'i>(
    store: &dyn Store,
    index: &'i ReferenceIndex,
    filename: &str,
    subtopic_id: &str,
    report: &mut IngestReport,
) -> Option<AdmittedDocument<'i>> {
    match store.subtopic_exists(subtopic_id) {
        Ok(true) => {}
        Ok(false) => {
            report.warn(format!(
                "skip {filename}: subtopic {subtopic_id} is not loaded"
            ));
            return None;
        }
        Err(err) => {
            report.record_failure("subtopic", subtopic_id, &err);
            return None;
        }
    }

    let Some(topic_id) = index.topic_for(subtopic_id) else {
        report.warn(format!(
            "skip {filename}: no topic mapped for subtopic {subtopic_id}"
        ));
        return None;
    };

    let nodes = index.tree_nodes_for(subtopic_id);
    if nodes.is_empty() {
        report.warn(format!("skip {filename}: no tree nodes for subtopic {subtopic_id}"));
        return None;
    }

    Some(AdmittedDocument {
        filename: filename.to_string(),
        subtopic_id: subtopic_id.to_string(),
        topic_id: topic_id.to_string(),
        nodes,
    })
}

/// Resolves chapters, recovers every anchored article and writes them with their tables and
/// attachments. Related-article pairs are appended to `candidates` unvalidated.
pub fn process_document(
    store: &dyn Store,
    extractor: &ArticleExtractor,
    admitted: &AdmittedDocument<'_>,
    markup: &str,
    candidates: &mut Vec<CrossReference>,
    report: &mut IngestReport,
) -> DocumentSummary {
    let layout = resolve_chapters(&admitted.subtopic_id, admitted.nodes);
    let mut summary = DocumentSummary {
        chapters: layout.chapters.len(),
        article_candidates: layout.article_nodes.len(),
        articles: 0,
    };

    for chapter in &layout.chapters {
        match store.upsert_chapter(chapter) {
            Ok(UpsertOutcome::Inserted) => {
                report.counts.chapters_inserted += 1;
                if chapter.placeholder {
                    report.counts.placeholder_chapters += 1;
                }
            }
            Ok(UpsertOutcome::Ignored) => {}
            Err(err) => report.record_failure("chapter", &chapter.code, &err),
        }
    }

    let document = SourceDocument::parse(markup);
    let anchors = document.anchors();
    debug!(
        document = %admitted.filename,
        anchors = anchors.len(),
        "parsed document"
    );

    let mut ordinal = 0_i64;
    for node in &layout.article_nodes {
        report.counts.article_candidates += 1;

        let extracted = match extractor.extract(&anchors, node) {
            Extraction::Found(extracted) => extracted,
            Extraction::MissingAnchor => {
                report.counts.articles_without_anchor += 1;
                debug!(
                    document = %admitted.filename,
                    code = %node.code,
                    "no anchor for article node"
                );
                continue;
            }
            Extraction::MissingContent => {
                report.counts.articles_without_content += 1;
                debug!(
                    document = %admitted.filename,
                    code = %node.code,
                    "no content block for article node"
                );
                continue;
            }
        };

        let article = Article {
            code: node.code.clone(),
            name: extracted.title,
            subtopic_id: admitted.subtopic_id.clone(),
            chapter_id: layout.chapter_for(&node.code).to_string(),
            topic_id: admitted.topic_id.clone(),
            content: extracted.content,
            index_label: node.index_label.trim().parse::<i64>().unwrap_or(0),
            external_reference_text: extracted.external_reference_text,
            external_reference_link: extracted.external_reference_link,
            ordinal,
        };

        match store.upsert_article(&article) {
            Ok(UpsertOutcome::Inserted) => report.counts.articles_inserted += 1,
            Ok(UpsertOutcome::Ignored) => report.counts.articles_ignored += 1,
            Err(err) => {
                report.record_failure("article", &article.code, &err);
                continue;
            }
        }
        ordinal += 1;
        summary.articles += 1;

        for (idx, markup) in extracted.tables.into_iter().enumerate() {
            let table = ArticleTable {
                article_code: article.code.clone(),
                ordinal: idx as i64,
                markup,
            };
            match store.upsert_table(&table) {
                Ok(UpsertOutcome::Inserted) => report.counts.tables_inserted += 1,
                Ok(UpsertOutcome::Ignored) => {}
                Err(err) => {
                    report.record_failure("table", &format!("{}#{}", table.article_code, idx), &err)
                }
            }
        }

        for link in extracted.attachments {
            let file = FileAttachment {
                article_code: article.code.clone(),
                link,
                local_path: String::new(),
            };
            match store.upsert_file(&file) {
                Ok(UpsertOutcome::Inserted) => report.counts.files_inserted += 1,
                Ok(UpsertOutcome::Ignored) => {}
                Err(err) => report.record_failure(
                    "file",
                    &format!("{} {}", file.article_code, file.link),
                    &err,
                ),
            }
        }

        candidates.extend(
            extracted
                .related_codes
                .into_iter()
                .map(|related| CrossReference {
                    article_code_a: article.code.clone(),
                    article_code_b: related,
                }),
        );
    }

    info!(
        document = %admitted.filename,
        chapters = summary.chapters,
        placeholder = layout.has_placeholder(),
        candidates = summary.article_candidates,
        articles = summary.articles,
        "document processed"
    );

    summary
}
