use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw `chude.json` row.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicRecord {
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Text", default)]
    pub text: Option<String>,
    #[serde(rename = "STT", default)]
    pub stt: Option<Value>,
}

/// Raw `demuc.json` row.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtopicRecord {
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Text", default)]
    pub text: Option<String>,
    #[serde(rename = "STT", default)]
    pub stt: Option<Value>,
    #[serde(rename = "ChuDe", default)]
    pub chude: Option<String>,
}

/// Raw `treeNode.json` row.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeNodeRecord {
    #[serde(rename = "MAPC", default)]
    pub mapc: Option<String>,
    #[serde(rename = "TEN", default)]
    pub ten: Option<String>,
    #[serde(rename = "DeMucID", default)]
    pub demuc_id: Option<String>,
    #[serde(rename = "ChiMuc", default)]
    pub chi_muc: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub name: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtopic {
    pub id: String,
    pub name: String,
    pub ordinal: i64,
    pub topic_id: Option<String>,
}

/// Structural node of a subtopic, read from the tree-node listing and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub code: String,
    pub title: String,
    pub subtopic_id: String,
    pub index_label: String,
}

impl TreeNode {
    pub fn from_record(record: &TreeNodeRecord) -> Option<Self> {
        let subtopic_id = record.demuc_id.as_deref()?.trim();
        if subtopic_id.is_empty() {
            return None;
        }

        Some(Self {
            code: record.mapc.clone().unwrap_or_default(),
            title: record.ten.clone().unwrap_or_default(),
            subtopic_id: subtopic_id.to_string(),
            index_label: record
                .chi_muc
                .as_ref()
                .map(json_scalar_string)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub code: String,
    pub name: String,
    pub subtopic_id: String,
    pub index_label: String,
    pub ordinal: i64,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub code: String,
    pub name: String,
    pub subtopic_id: String,
    pub chapter_id: String,
    pub topic_id: String,
    pub content: String,
    pub index_label: i64,
    pub external_reference_text: String,
    pub external_reference_link: Option<String>,
    pub ordinal: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTable {
    pub article_code: String,
    pub ordinal: i64,
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub article_code: String,
    pub link: String,
    pub local_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrossReference {
    pub article_code_a: String,
    pub article_code_b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub filename: String,
    pub subtopic_id: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub checkpoint: Option<String>,
    pub document_count: usize,
    pub resumed_document_count: usize,
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestPaths {
    pub topics_path: String,
    pub subtopics_path: String,
    pub tree_nodes_path: String,
    pub documents_dir: String,
    pub manifest_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestCounts {
    pub topics_inserted: usize,
    pub topics_ignored: usize,
    pub subtopics_inserted: usize,
    pub subtopics_ignored: usize,
    pub subtopics_dropped: usize,
    pub documents_listed: usize,
    pub documents_before_checkpoint: usize,
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub chapters_inserted: usize,
    pub placeholder_chapters: usize,
    pub article_candidates: usize,
    pub articles_inserted: usize,
    pub articles_ignored: usize,
    pub articles_without_anchor: usize,
    pub articles_without_content: usize,
    pub tables_inserted: usize,
    pub files_inserted: usize,
    pub cross_reference_candidates: usize,
    pub cross_references_inserted: usize,
    pub cross_references_discarded: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistenceFailureEntry {
    pub entity: String,
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub checkpoint: Option<String>,
    pub reset: bool,
    pub paths: IngestPaths,
    pub counts: IngestCounts,
    pub persistence_failures: Vec<PersistenceFailureEntry>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvariantSummary {
    pub subtopics_missing_topic: i64,
    /// Articles whose chapter code does not prefix theirs; expected when the first-chapter
    /// fallback applied, so reported but not counted as a violation.
    pub fallback_chapter_assignments: i64,
    pub articles_missing_chapter: i64,
    pub subtopics_with_multiple_placeholders: i64,
    pub cross_references_dangling: i64,
    pub tables_orphaned: i64,
    pub files_orphaned: i64,
}

impl InvariantSummary {
    pub fn violation_count(&self) -> i64 {
        self.subtopics_missing_topic
            + self.articles_missing_chapter
            + self.subtopics_with_multiple_placeholders
            + self.cross_references_dangling
            + self.tables_orphaned
            + self.files_orphaned
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub db_path: String,
    pub status: String,
    pub invariants: InvariantSummary,
}

/// Renders a JSON scalar the way the source listings mean it: strings verbatim, numbers as
/// their decimal form, anything else empty.
pub fn json_scalar_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => String::new(),
    }
}

/// Integer view of an ordinal-like JSON field; unparseable input yields `default`.
pub fn lenient_int(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64))
            .unwrap_or(default),
        Some(Value::String(text)) => text.trim().parse::<i64>().unwrap_or(default),
        Some(Value::Bool(flag)) => i64::from(*flag),
        _ => default,
    }
}
