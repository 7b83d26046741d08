use std::cell::RefCell;
use std::fs;
use std::path::Path;

use rusqlite::Connection;

use super::anchors::{ArticleExtractor, Extraction};
use super::batch::{ResumableBatch, list_documents, subtopic_id_for};
use super::chapters::{placeholder_code, resolve_chapters, roman_to_int};
use super::cross_refs::resolve_cross_references;
use super::db_setup::{configure_connection, ensure_schema};
use super::document::SourceDocument;
use super::pipeline::{AdmittedDocument, process_document};
use super::reference::{ReferenceData, ReferenceIndex, load_reference};
use super::report::IngestReport;
use super::run::ingest_corpus;
use super::store::{PersistenceError, Store, StoreResult, UpsertOutcome};
use crate::model::{
    Article, ArticleTable, Chapter, CrossReference, FileAttachment, Subtopic, Topic, TreeNode,
};

fn node(code: &str, title: &str, index_label: &str) -> TreeNode {
    TreeNode {
        code: code.to_string(),
        title: title.to_string(),
        subtopic_id: "S1".to_string(),
        index_label: index_label.to_string(),
    }
}

fn extract(markup: &str, tree_node: &TreeNode) -> Extraction {
    let extractor = ArticleExtractor::new().expect("extractor compiles");
    let document = SourceDocument::parse(markup);
    let anchors = document.anchors();
    extractor.extract(&anchors, tree_node)
}

fn found(extraction: Extraction) -> super::anchors::ExtractedArticle {
    match extraction {
        Extraction::Found(article) => article,
        other => panic!("expected an extracted article, got {other:?}"),
    }
}

#[test]
fn roman_to_int_handles_subtractive_forms_and_rejects_garbage() {
    assert_eq!(roman_to_int("II"), 2);
    assert_eq!(roman_to_int("IV"), 4);
    assert_eq!(roman_to_int("XIV"), 14);
    assert_eq!(roman_to_int(" xl "), 40);
    assert_eq!(roman_to_int("MCMXCIV"), 1994);
    assert_eq!(roman_to_int(""), 0);
    assert_eq!(roman_to_int("12"), 0);
    assert_eq!(roman_to_int("II."), 0);
}

#[test]
fn resolve_chapters_assigns_first_prefix_match_in_encounter_order() {
    let nodes = vec![
        node("C1", "Chương I NHỮNG QUY ĐỊNH CHUNG", "I"),
        node("C1.1", "Điều 1", "1"),
        node("C2", "Chương II QUYỀN CON NGƯỜI", "II"),
        node("C2.5", "Điều 5", "5"),
        node("Z9", "Điều 9", "9"),
        node("", "Điều không mã", "10"),
    ];

    let layout = resolve_chapters("S1", &nodes);

    let codes: Vec<&str> = layout.chapters.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["C1", "C2"]);
    assert_eq!(layout.chapters[1].ordinal, 2);
    assert_eq!(layout.chapters[1].index_label, "II");
    assert!(!layout.has_placeholder());

    let articles: Vec<&str> = layout.article_nodes.iter().map(|n| n.code.as_str()).collect();
    assert_eq!(articles, vec!["C1.1", "C2.5", "Z9"]);

    assert_eq!(layout.chapter_for("C2.5"), "C2");
    assert_eq!(layout.chapter_for("C1.1"), "C1");
    assert_eq!(layout.chapter_for("Z9"), "C1");
}

#[test]
fn resolve_chapters_prefers_earlier_chapter_when_codes_overlap() {
    let nodes = vec![
        node("C1", "Chương I", "I"),
        node("C10", "Chương X", "X"),
        node("C10.2", "Điều 2", "2"),
    ];

    let layout = resolve_chapters("S1", &nodes);

    assert_eq!(layout.chapter_for("C10.2"), "C1");
}

#[test]
fn resolve_chapters_synthesizes_one_stable_placeholder() {
    let nodes = vec![node("A1", "Điều 1", "1"), node("A2", "Điều 2", "2")];

    let layout = resolve_chapters("S1", &nodes);

    assert_eq!(layout.chapters.len(), 1);
    let placeholder = &layout.chapters[0];
    assert!(placeholder.placeholder);
    assert_eq!(placeholder.code, placeholder_code("S1"));
    assert_eq!(placeholder.name, "");
    assert_eq!(placeholder.index_label, "0");
    assert_eq!(placeholder.ordinal, 0);
    assert_eq!(layout.chapter_for("A2"), placeholder.code);
    assert_ne!(placeholder_code("S1"), placeholder_code("S2"));
}

#[test]
fn chapter_nodes_without_code_still_leave_a_placeholder() {
    let nodes = vec![node("", "Chương I", "I"), node("A1", "Điều 1", "1")];

    let layout = resolve_chapters("S1", &nodes);

    assert!(layout.has_placeholder());
    assert_eq!(layout.article_nodes.len(), 1);
}

#[test]
fn resumable_batch_starts_at_checkpoint_inclusive() {
    let files = vec!["a.html".to_string(), "b.html".to_string(), "c.html".to_string()];

    let mut batch = ResumableBatch::from_checkpoint(files.clone(), Some("b.html".to_string()));
    let visited: Vec<String> = batch.by_ref().collect();
    assert_eq!(visited, vec!["b.html", "c.html"]);
    assert_eq!(batch.skipped(), 1);
    assert!(batch.started());

    let all: Vec<String> = ResumableBatch::from_checkpoint(files.clone(), None).collect();
    assert_eq!(all, files);

    let mut missing = ResumableBatch::from_checkpoint(files, Some("zz.html".to_string()));
    assert_eq!(missing.by_ref().count(), 0);
    assert!(!missing.started());
    assert_eq!(missing.skipped(), 3);
}

#[test]
fn resumable_batch_accepts_any_start_predicate() {
    let files = vec!["1.html", "2.html", "3.html"].into_iter().map(String::from);
    let visited: Vec<String> = ResumableBatch::new(files, |name: &str| name >= "2").collect();
    assert_eq!(visited, vec!["2.html", "3.html"]);
}

#[test]
fn list_documents_sorts_and_filters_by_extension() {
    let dir = tempfile::tempdir().expect("tempdir");
    for name in ["b.html", "a.html", "c.txt"] {
        fs::write(dir.path().join(name), "").expect("write fixture");
    }
    fs::create_dir(dir.path().join("nested.html")).expect("create dir");

    let documents = list_documents(dir.path(), "html").expect("list");

    assert_eq!(documents, vec!["a.html", "b.html"]);
    assert_eq!(subtopic_id_for("d8e4a3a0-254c.html"), "d8e4a3a0-254c");
}

#[test]
fn related_code_reads_single_quoted_argument() {
    let extractor = ArticleExtractor::new().expect("extractor compiles");
    assert_eq!(
        extractor.related_code("ViewNoiDungPhapDien('12.3.LQ.4')"),
        "12.3.LQ.4"
    );
    assert_eq!(extractor.related_code("go(C1.1)"), "C1.1");
    assert_eq!(extractor.related_code("broken"), "broken");
}

const FULL_ARTICLE: &str = r##"<html><body>
<p class="pDieu"><a name="C2.5"></a>Điều 5. Quyền con người</p>
<p class="pGhiChu">(Điều 5 Luật số <a href="https://vbpl.vn/12">12/2020/QH14</a>)</p>
<div class="pNoiDung">Khoản 1<br><table><tr><td>x</td></tr></table>Khoản 2</div>
<a href="/files/mau-01.doc">Mẫu 01</a>
<a href="/files/mau-02.pdf">Mẫu 02</a>
<p class="pChiDan">
<a onclick="ViewNoiDungPhapDien('C1.1')">Điều 1</a>
<a href="#top">lên</a>
<a onclick="ViewNoiDungPhapDien('S2.1')">Điều khác</a>
</p>
</body></html>"##;

#[test]
fn extract_recovers_every_part_of_an_article() {
    let article = found(extract(FULL_ARTICLE, &node("C2.5", "Điều 5", "5")));

    assert_eq!(article.title, "Điều 5. Quyền con người");
    assert_eq!(
        article.external_reference_text,
        "(Điều 5 Luật số 12/2020/QH14 )"
    );
    assert_eq!(
        article.external_reference_link.as_deref(),
        Some("https://vbpl.vn/12")
    );
    assert_eq!(article.content, "Khoản 1\n\nKhoản 2");
    assert_eq!(article.tables.len(), 1);
    assert!(article.tables[0].starts_with("<table>"));
    assert!(article.tables[0].contains("<td>x</td>"));
    assert_eq!(
        article.attachments,
        vec!["/files/mau-01.doc", "/files/mau-02.pdf"]
    );
    assert_eq!(article.related_codes, vec!["C1.1", "S2.1"]);
}

const PARAGRAPH_WITH_TABLE: &str = r#"<html><body>
<p class="pDieu"><a name="A1"></a>Điều 1</p>
<p class="pNoiDung">Khoản 1<table><tr><td>x</td></tr></table>Khoản 2</p>
<a href="/f.pdf">Tệp</a>
<p class="pChiDan"><a onclick="ViewNoiDungPhapDien('B1')">Điều B1</a></p>
<p><a name="A2"></a>Điều 2</p>
</body></html>"#;

#[test]
fn table_inside_paragraph_body_survives_standards_mode_parsing() {
    let tree_node = node("A1", "Điều 1", "1");
    let quirks = found(extract(PARAGRAPH_WITH_TABLE, &tree_node));
    let standards = found(extract(
        &format!("<!DOCTYPE html>\n{PARAGRAPH_WITH_TABLE}"),
        &tree_node,
    ));

    assert_eq!(standards.content, "Khoản 1\nKhoản 2");
    assert_eq!(standards.tables.len(), 1);
    assert!(standards.tables[0].contains("<td>x</td>"));
    assert_eq!(standards.attachments, vec!["/f.pdf"]);
    assert_eq!(standards.related_codes, vec!["B1"]);
    assert_eq!(standards, quirks);
}

#[test]
fn paragraph_body_without_table_does_not_absorb_following_blocks() {
    let markup = r#"<!DOCTYPE html>
<p><a name="A1"></a>Điều 1</p>
<p class="pNoiDung">Nội dung</p><table><tr><td>bảng ngoài</td></tr></table>
<p><a name="A2"></a>Điều 2</p>"#;

    let article = found(extract(markup, &node("A1", "Điều 1", "1")));

    assert_eq!(article.content, "Nội dung");
    assert!(article.tables.is_empty());
    assert!(article.attachments.is_empty());
}

#[test]
fn extract_falls_back_to_node_title_and_skips_missing_note() {
    let markup = r#"<p><a name="A1"></a>   </p>
<p class="pNoiDung">Nội dung</p>
<p class="other">không phải chỉ dẫn</p>"#;

    let article = found(extract(markup, &node("A1", "Điều 1. Tiêu đề", "1")));

    assert_eq!(article.title, "Điều 1. Tiêu đề");
    assert_eq!(article.external_reference_text, "");
    assert_eq!(article.external_reference_link, None);
    assert_eq!(article.content, "Nội dung");
    assert!(article.attachments.is_empty());
    assert!(article.related_codes.is_empty());
}

#[test]
fn extract_searches_forward_when_anchor_has_no_paragraph() {
    let markup = r#"<div class="pDieu"><a name="X1"></a>Điều X</div>
<div><span>chen giữa</span></div>
<p class="pNoiDung">Nội dung dự phòng</p>"#;

    let article = found(extract(markup, &node("X1", "Điều X", "1")));

    assert_eq!(article.title, "Điều X");
    assert_eq!(article.content, "Nội dung dự phòng");
}

#[test]
fn extract_reports_missing_anchor_and_missing_body() {
    let markup = r#"<p><a name="A1"></a>Điều 1</p><p class="pGhiChu">ghi chú</p>"#;

    assert_eq!(
        extract(markup, &node("A2", "Điều 2", "2")),
        Extraction::MissingAnchor
    );
    assert_eq!(
        extract(markup, &node("A1", "Điều 1", "1")),
        Extraction::MissingContent
    );
}

#[test]
fn first_anchor_with_a_name_wins() {
    let markup = r#"<p><a name="A1"></a>Lần đầu</p><p class="pNoiDung">một</p>
<p><a name="A1"></a>Lần hai</p><p class="pNoiDung">hai</p>"#;

    let article = found(extract(markup, &node("A1", "Điều 1", "1")));

    assert_eq!(article.title, "Lần đầu");
    assert_eq!(article.content, "một");
}

/// In-memory store that records writes and can be told to reject articles.
#[derive(Default)]
struct RecordingStore {
    fail_articles: Vec<String>,
    articles: RefCell<Vec<Article>>,
    chapters: RefCell<Vec<Chapter>>,
    tables: RefCell<Vec<ArticleTable>>,
    files: RefCell<Vec<FileAttachment>>,
    cross_references: RefCell<Vec<CrossReference>>,
}

impl Store for RecordingStore {
    fn upsert_topic(&self, _topic: &Topic) -> StoreResult<UpsertOutcome> {
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_subtopic(&self, _subtopic: &Subtopic) -> StoreResult<UpsertOutcome> {
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_chapter(&self, chapter: &Chapter) -> StoreResult<UpsertOutcome> {
        self.chapters.borrow_mut().push(chapter.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_article(&self, article: &Article) -> StoreResult<UpsertOutcome> {
        if self.fail_articles.contains(&article.code) {
            return Err(PersistenceError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.articles.borrow_mut().push(article.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_table(&self, table: &ArticleTable) -> StoreResult<UpsertOutcome> {
        self.tables.borrow_mut().push(table.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_file(&self, file: &FileAttachment) -> StoreResult<UpsertOutcome> {
        self.files.borrow_mut().push(file.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn upsert_cross_reference(&self, reference: &CrossReference) -> StoreResult<UpsertOutcome> {
        self.cross_references.borrow_mut().push(reference.clone());
        Ok(UpsertOutcome::Inserted)
    }

    fn topic_exists(&self, _id: &str) -> StoreResult<bool> {
        Ok(true)
    }

    fn subtopic_exists(&self, _id: &str) -> StoreResult<bool> {
        Ok(true)
    }

    fn article_exists(&self, code: &str) -> StoreResult<bool> {
        Ok(self.articles.borrow().iter().any(|article| article.code == code))
    }
}

const TWO_ARTICLES: &str = r#"<p><a name="A1"></a>Điều 1</p>
<p class="pNoiDung">một</p>
<a href="/f/1.pdf">f</a>
<p><a name="A3"></a>Điều 3</p>
<p class="pNoiDung">ba</p>
<p class="pChiDan"><a onclick="go('A1')">Điều 1</a></p>"#;

#[test]
fn process_document_skips_unanchored_nodes_without_consuming_ordinals() {
    let store = RecordingStore::default();
    let extractor = ArticleExtractor::new().expect("extractor compiles");
    let nodes = vec![
        node("A1", "Điều 1", "1"),
        node("A2", "Điều 2", "2"),
        node("A3", "Điều 3", "3"),
    ];
    let admitted = AdmittedDocument {
        filename: "S1.html".to_string(),
        subtopic_id: "S1".to_string(),
        topic_id: "T1".to_string(),
        nodes: &nodes,
    };
    let mut candidates = Vec::new();
    let mut report = IngestReport::default();

    let summary = process_document(
        &store,
        &extractor,
        &admitted,
        TWO_ARTICLES,
        &mut candidates,
        &mut report,
    );

    assert_eq!(summary.articles, 2);
    assert_eq!(summary.article_candidates, 3);
    assert_eq!(report.counts.articles_without_anchor, 1);
    assert_eq!(report.counts.placeholder_chapters, 1);

    let articles = store.articles.borrow();
    let ordinals: Vec<(&str, i64)> = articles
        .iter()
        .map(|article| (article.code.as_str(), article.ordinal))
        .collect();
    assert_eq!(ordinals, vec![("A1", 0), ("A3", 1)]);
    assert!(articles.iter().all(|article| article.chapter_id == placeholder_code("S1")));
    assert_eq!(articles[1].index_label, 3);
    assert_eq!(articles[0].topic_id, "T1");

    let files = store.files.borrow();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].article_code, "A1");
    assert_eq!(files[0].local_path, "");

    assert_eq!(
        candidates,
        vec![CrossReference {
            article_code_a: "A3".to_string(),
            article_code_b: "A1".to_string(),
        }]
    );
}

#[test]
fn failed_article_insert_is_recorded_and_leaves_its_ordinal_free() {
    let store = RecordingStore {
        fail_articles: vec!["A1".to_string()],
        ..RecordingStore::default()
    };
    let extractor = ArticleExtractor::new().expect("extractor compiles");
    let nodes = vec![node("A1", "Điều 1", "1"), node("A3", "Điều 3", "3")];
    let admitted = AdmittedDocument {
        filename: "S1.html".to_string(),
        subtopic_id: "S1".to_string(),
        topic_id: "T1".to_string(),
        nodes: &nodes,
    };
    let mut candidates = Vec::new();
    let mut report = IngestReport::default();

    process_document(
        &store,
        &extractor,
        &admitted,
        TWO_ARTICLES,
        &mut candidates,
        &mut report,
    );

    assert_eq!(report.persistence_failures.len(), 1);
    assert_eq!(report.persistence_failures[0].entity, "article");
    assert_eq!(report.persistence_failures[0].key, "A1");
    assert!(store.files.borrow().is_empty());

    let articles = store.articles.borrow();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].code, "A3");
    assert_eq!(articles[0].ordinal, 0);
    assert_eq!(candidates.len(), 1);
}

#[test]
fn cross_references_need_both_endpoints() {
    let store = RecordingStore::default();
    store.articles.borrow_mut().push(Article {
        code: "A1".to_string(),
        name: String::new(),
        subtopic_id: "S1".to_string(),
        chapter_id: "C1".to_string(),
        topic_id: "T1".to_string(),
        content: String::new(),
        index_label: 1,
        external_reference_text: String::new(),
        external_reference_link: None,
        ordinal: 0,
    });
    let pair = |a: &str, b: &str| CrossReference {
        article_code_a: a.to_string(),
        article_code_b: b.to_string(),
    };
    let candidates = vec![pair("A1", "B9"), pair("A1", "A1"), pair("A1", "A1")];
    let mut report = IngestReport::default();

    resolve_cross_references(&store, &candidates, &mut report);

    assert_eq!(*store.cross_references.borrow(), vec![pair("A1", "A1")]);
    assert_eq!(report.counts.cross_reference_candidates, 3);
    assert_eq!(report.counts.cross_references_discarded, 1);
    assert_eq!(report.counts.cross_references_inserted, 1);
}

const TOPICS_JSON: &str = r#"[
  {"Value": "T1", "Text": "Hiến pháp", "STT": 1},
  {"Value": "", "Text": "không mã"},
  {"Text": "thiếu mã"}
]"#;

const SUBTOPICS_JSON: &str = r#"[
  {"Value": "S1", "Text": "Đề mục 1", "STT": "1", "ChuDe": "T1"},
  {"Value": "S2", "Text": "Đề mục 2", "STT": 2, "ChuDe": "T1"},
  {"Value": "S9", "Text": "Đề mục mồ côi", "STT": 3, "ChuDe": "T404"}
]"#;

const TREE_NODES_JSON: &str = r#"[
  {"MAPC": "C2", "TEN": "Chương II QUYỀN CON NGƯỜI", "DeMucID": "S1", "ChiMuc": "II"},
  {"MAPC": "C2.5", "TEN": "Điều 5", "DeMucID": "S1", "ChiMuc": "5"},
  {"MAPC": "C2.6", "TEN": "Điều 6", "DeMucID": "S1", "ChiMuc": 6},
  {"MAPC": "S2.1", "TEN": "Điều 1", "DeMucID": "S2", "ChiMuc": 1},
  {"MAPC": "S9.1", "TEN": "Điều 1", "DeMucID": "S9", "ChiMuc": 1}
]"#;

const S1_HTML: &str = r#"<html><body>
<p class="pDieu"><a name="C2.5"></a>Điều 5. Quyền con người</p>
<p class="pGhiChu">(Điều 5 Hiến pháp <a href="https://vbpl.vn/hp">2013</a>)</p>
<p class="pNoiDung">Điều nội dung</p>
<a href="/files/bm-01.doc">Biểu mẫu</a>
<p class="pChiDan">
<a onclick="ViewNoiDungPhapDien('S2.1')">Điều 1</a>
<a onclick="ViewNoiDungPhapDien('B9')">Điều 9</a>
</p>
</body></html>"#;

const S2_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<p class="pDieu"><a name="S2.1"></a>Điều 1. Phạm vi</p>
<p class="pNoiDung">Bảng phí<table><tr><td>100</td></tr></table></p>
<p class="pChiDan"><a onclick="ViewNoiDungPhapDien('C2.5')">Điều 5</a></p>
</body></html>"#;

const S9_HTML: &str = r#"<p><a name="S9.1"></a>Điều 1</p><p class="pNoiDung">bỏ qua</p>"#;

fn reference_data() -> ReferenceData {
    ReferenceData {
        topics: serde_json::from_str(TOPICS_JSON).expect("topics json"),
        subtopics: serde_json::from_str(SUBTOPICS_JSON).expect("subtopics json"),
        tree_nodes: serde_json::from_str(TREE_NODES_JSON).expect("tree nodes json"),
    }
}

fn write_documents(dir: &Path) {
    fs::write(dir.join("S1.html"), S1_HTML).expect("write S1");
    fs::write(dir.join("S2.html"), S2_HTML).expect("write S2");
    fs::write(dir.join("S9.html"), S9_HTML).expect("write S9");
}

fn open_database(dir: &Path) -> Connection {
    let connection = Connection::open(dir.join("phapdien.sqlite")).expect("open db");
    configure_connection(&connection).expect("configure");
    ensure_schema(&connection).expect("schema");
    connection
}

fn count(connection: &Connection, sql: &str) -> i64 {
    connection
        .query_row(sql, [], |row| row.get(0))
        .expect("count query")
}

fn dump_table(connection: &Connection, table: &str) -> Vec<String> {
    let mut statement = connection
        .prepare(&format!("SELECT * FROM {table} ORDER BY 1, 2"))
        .expect("prepare dump");
    let columns = statement.column_count();
    let rows = statement
        .query_map([], |row| {
            let mut cells = Vec::with_capacity(columns);
            for idx in 0..columns {
                cells.push(format!("{:?}", row.get::<_, rusqlite::types::Value>(idx)?));
            }
            Ok(cells.join("|"))
        })
        .expect("dump query");
    rows.collect::<Result<Vec<_>, _>>().expect("dump rows")
}

fn dump_all(connection: &Connection) -> Vec<Vec<String>> {
    [
        "topics",
        "subtopics",
        "chapters",
        "articles",
        "article_tables",
        "article_files",
        "cross_references",
    ]
    .iter()
    .map(|table| dump_table(connection, table))
    .collect()
}

#[test]
fn reference_loader_drops_subtopics_with_unknown_topic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = open_database(dir.path());
    let data = reference_data();
    let mut report = IngestReport::default();

    load_reference(&super::store::SqliteStore::new(&connection), &data, &mut report);

    assert_eq!(report.counts.topics_inserted, 1);
    assert_eq!(report.counts.subtopics_inserted, 2);
    assert_eq!(report.counts.subtopics_dropped, 1);
    assert!(report.warnings.iter().any(|warning| warning.contains("S9")));
    assert_eq!(count(&connection, "SELECT COUNT(*) FROM subtopics WHERE id = 'S9'"), 0);
    assert_eq!(
        count(&connection, "SELECT ordinal FROM subtopics WHERE id = 'S1'"),
        1
    );

    let index = ReferenceIndex::build(&data);
    assert_eq!(index.topic_for("S1"), Some("T1"));
    assert_eq!(index.topic_for("missing"), None);
    assert_eq!(index.tree_nodes_for("S1").len(), 3);
    assert!(index.tree_nodes_for("S3").is_empty());
}

#[test]
fn ingest_corpus_rebuilds_hierarchy_across_documents() {
    let dir = tempfile::tempdir().expect("tempdir");
    let docs = dir.path().join("demuc");
    fs::create_dir(&docs).expect("docs dir");
    write_documents(&docs);
    let mut connection = open_database(dir.path());

    let report =
        ingest_corpus(&mut connection, &reference_data(), &docs, "html", None).expect("ingest");

    assert_eq!(report.counts.documents_listed, 3);
    assert_eq!(report.counts.documents_processed, 2);
    assert_eq!(report.counts.documents_skipped, 1);
    assert_eq!(report.counts.articles_inserted, 2);
    assert_eq!(report.counts.articles_without_anchor, 1);
    assert!(report.persistence_failures.is_empty());

    let (chapter_id, content, ordinal): (String, String, i64) = connection
        .query_row(
            "SELECT chapter_id, content, ordinal FROM articles WHERE code = 'C2.5'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("article C2.5");
    assert_eq!(chapter_id, "C2");
    assert_eq!(content, "Điều nội dung");
    assert_eq!(ordinal, 0);

    assert_eq!(
        count(&connection, "SELECT ordinal FROM chapters WHERE code = 'C2'"),
        2
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM chapters WHERE subtopic_id = 'S2'"),
        1
    );
    let s2_chapter: String = connection
        .query_row(
            "SELECT chapter_id FROM articles WHERE code = 'S2.1'",
            [],
            |row| row.get(0),
        )
        .expect("article S2.1");
    assert_eq!(s2_chapter, placeholder_code("S2"));

    assert_eq!(count(&connection, "SELECT COUNT(*) FROM articles WHERE code = 'C2.6'"), 0);
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM article_files WHERE article_code = 'C2.5'"),
        1
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM article_tables WHERE article_code = 'S2.1'"),
        1
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM article_tables WHERE article_code = 'C2.6'"),
        0
    );
    assert_eq!(
        count(&connection, "SELECT COUNT(*) FROM article_files WHERE article_code = 'C2.6'"),
        0
    );

    assert_eq!(report.counts.cross_reference_candidates, 3);
    assert_eq!(report.counts.cross_references_inserted, 2);
    assert_eq!(report.counts.cross_references_discarded, 1);
    assert_eq!(
        dump_table(&connection, "cross_references"),
        vec![
            "Text(\"C2.5\")|Text(\"S2.1\")".to_string(),
            "Text(\"S2.1\")|Text(\"C2.5\")".to_string(),
        ]
    );
}

#[test]
fn ingest_corpus_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let docs = dir.path().join("demuc");
    fs::create_dir(&docs).expect("docs dir");
    write_documents(&docs);
    let mut connection = open_database(dir.path());
    let data = reference_data();

    ingest_corpus(&mut connection, &data, &docs, "html", None).expect("first ingest");
    let first = dump_all(&connection);

    let second_report =
        ingest_corpus(&mut connection, &data, &docs, "html", None).expect("second ingest");
    let second = dump_all(&connection);

    assert_eq!(first, second);
    assert_eq!(second_report.counts.articles_inserted, 0);
    assert_eq!(second_report.counts.articles_ignored, 2);
    assert_eq!(second_report.counts.chapters_inserted, 0);
    assert_eq!(second_report.counts.topics_ignored, 1);
}

#[test]
fn ingest_corpus_resumes_from_checkpoint() {
    let dir = tempfile::tempdir().expect("tempdir");
    let docs = dir.path().join("demuc");
    fs::create_dir(&docs).expect("docs dir");
    write_documents(&docs);
    let mut connection = open_database(dir.path());

    let report = ingest_corpus(
        &mut connection,
        &reference_data(),
        &docs,
        "html",
        Some("S2.html".to_string()),
    )
    .expect("ingest");

    assert_eq!(report.counts.documents_before_checkpoint, 1);
    assert_eq!(report.counts.documents_processed, 1);
    assert_eq!(count(&connection, "SELECT COUNT(*) FROM articles"), 1);
    assert_eq!(count(&connection, "SELECT COUNT(*) FROM articles WHERE code = 'C2.5'"), 0);
    assert_eq!(count(&connection, "SELECT COUNT(*) FROM cross_references"), 0);
    assert_eq!(report.counts.cross_references_discarded, 1);
}

#[test]
fn ingest_corpus_warns_when_checkpoint_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let docs = dir.path().join("demuc");
    fs::create_dir(&docs).expect("docs dir");
    write_documents(&docs);
    let mut connection = open_database(dir.path());

    let report = ingest_corpus(
        &mut connection,
        &reference_data(),
        &docs,
        "html",
        Some("nope.html".to_string()),
    )
    .expect("ingest");

    assert_eq!(report.counts.documents_processed, 0);
    assert_eq!(report.counts.documents_before_checkpoint, 3);
    assert!(report.warnings.iter().any(|warning| warning.contains("nope.html")));
    assert_eq!(count(&connection, "SELECT COUNT(*) FROM topics"), 1);
}
