use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::model::{
    Subtopic, SubtopicRecord, Topic, TopicRecord, TreeNode, TreeNodeRecord, lenient_int,
};
use crate::util::read_json;

use super::report::IngestReport;
use super::store::{Store, UpsertOutcome};

#[derive(Debug, Default)]
pub struct ReferenceData {
    pub topics: Vec<TopicRecord>,
    pub subtopics: Vec<SubtopicRecord>,
    pub tree_nodes: Vec<TreeNodeRecord>,
}

impl ReferenceData {
    pub fn read(topics_path: &Path, subtopics_path: &Path, tree_nodes_path: &Path) -> Result<Self> {
        let data = Self {
            topics: read_json(topics_path)?,
            subtopics: read_json(subtopics_path)?,
            tree_nodes: read_json(tree_nodes_path)?,
        };

        info!(
            topics = data.topics.len(),
            subtopics = data.subtopics.len(),
            tree_nodes = data.tree_nodes.len(),
            "loaded reference listings"
        );

        Ok(data)
    }
}

/// Read-only lookups shared by every document once the reference pass is done.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    subtopic_topics: HashMap<String, Option<String>>,
    tree_nodes: HashMap<String, Vec<TreeNode>>,
}

impl ReferenceIndex {
    pub fn build(data: &ReferenceData) -> Self {
        let subtopic_topics = data
            .subtopics
            .iter()
            .filter_map(|record| {
                let id = usable_id(record.value.as_deref())?;
                Some((id.to_string(), topic_ref(record)))
            })
            .collect();

        let mut tree_nodes: HashMap<String, Vec<TreeNode>> = HashMap::new();
        for node in data.tree_nodes.iter().filter_map(TreeNode::from_record) {
            tree_nodes
                .entry(node.subtopic_id.clone())
                .or_default()
                .push(node);
        }

        Self {
            subtopic_topics,
            tree_nodes,
        }
    }

    /// Owning topic of a subtopic, `None` when the subtopic is unknown or declares no topic.
    pub fn topic_for(&self, subtopic_id: &str) -> Option<&str> {
        self.subtopic_topics.get(subtopic_id)?.as_deref()
    }

    /// Tree nodes of a subtopic in listing order.
    pub fn tree_nodes_for(&self, subtopic_id: &str) -> &[TreeNode] {
        self.tree_nodes
            .get(subtopic_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Persists topics, then subtopics whose declared topic is present. Never fails: every
/// dropped or unwritable record ends up in the report.
pub fn load_reference(store: &dyn Store, data: &ReferenceData, report: &mut IngestReport) {
    for record in &data.topics {
        let Some(id) = usable_id(record.value.as_deref()) else {
            continue;
        };
        let topic = Topic {
            id: id.to_string(),
            name: record.text.clone().unwrap_or_default(),
            ordinal: lenient_int(record.stt.as_ref(), 0),
        };

        match store.upsert_topic(&topic) {
            Ok(UpsertOutcome::Inserted) => report.counts.topics_inserted += 1,
            Ok(UpsertOutcome::Ignored) => report.counts.topics_ignored += 1,
            Err(err) => report.record_failure("topic", &topic.id, &err),
        }
    }
    info!(
        inserted = report.counts.topics_inserted,
        ignored = report.counts.topics_ignored,
        "topics loaded"
    );

    for record in &data.subtopics {
        let Some(id) = usable_id(record.value.as_deref()) else {
            continue;
        };
        let topic_id = topic_ref(record);

        if let Some(topic_id) = topic_id.as_deref() {
            match store.topic_exists(topic_id) {
                Ok(true) => {}
                Ok(false) => {
                    report.counts.subtopics_dropped += 1;
                    report.warn(format!(
                        "subtopic {id} references topic {topic_id} which is not loaded; skipped"
                    ));
                    continue;
                }
                Err(err) => {
                    report.counts.subtopics_dropped += 1;
                    report.record_failure("topic", topic_id, &err);
                    continue;
                }
            }
        }

        let subtopic = Subtopic {
            id: id.to_string(),
            name: record.text.clone().unwrap_or_default(),
            ordinal: lenient_int(record.stt.as_ref(), 0),
            topic_id,
        };

        match store.upsert_subtopic(&subtopic) {
            Ok(UpsertOutcome::Inserted) => report.counts.subtopics_inserted += 1,
            Ok(UpsertOutcome::Ignored) => report.counts.subtopics_ignored += 1,
            Err(err) => report.record_failure("subtopic", &subtopic.id, &err),
        }
    }
    info!(
        inserted = report.counts.subtopics_inserted,
        ignored = report.counts.subtopics_ignored,
        dropped = report.counts.subtopics_dropped,
        "subtopics loaded"
    );
}

fn usable_id(value: Option<&str>) -> Option<&str> {
    value.filter(|id| !id.trim().is_empty())
}

fn topic_ref(record: &SubtopicRecord) -> Option<String> {
    usable_id(record.chude.as_deref()).map(ToOwned::to_owned)
}
