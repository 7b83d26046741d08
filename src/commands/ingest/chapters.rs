use uuid::Uuid;

use crate::model::{Chapter, TreeNode};

/// Title prefix that marks a tree node as a chapter heading.
pub const CHAPTER_MARKER: &str = "Chương ";

/// Chapters of one subtopic and the nodes left over as article candidates.
#[derive(Debug)]
pub struct ChapterLayout<'n> {
    /// Encounter order; never empty.
    pub chapters: Vec<Chapter>,
    pub article_nodes: Vec<&'n TreeNode>,
}

impl ChapterLayout<'_> {
    /// First chapter, in encounter order, whose code prefixes `article_code`; otherwise the
    /// first chapter.
    pub fn chapter_for(&self, article_code: &str) -> &str {
        self.chapters
            .iter()
            .find(|chapter| article_code.starts_with(chapter.code.as_str()))
            .or_else(|| self.chapters.first())
            .map(|chapter| chapter.code.as_str())
            .unwrap_or_default()
    }

    pub fn has_placeholder(&self) -> bool {
        self.chapters.iter().any(|chapter| chapter.placeholder)
    }
}

pub fn resolve_chapters<'n>(subtopic_id: &str, nodes: &'n [TreeNode]) -> ChapterLayout<'n> {
    let (chapter_nodes, other_nodes): (Vec<&TreeNode>, Vec<&TreeNode>) = nodes
        .iter()
        .partition(|node| node.title.starts_with(CHAPTER_MARKER));

    let mut chapters: Vec<Chapter> = chapter_nodes
        .into_iter()
        .filter(|node| !node.code.is_empty())
        .map(|node| Chapter {
            code: node.code.clone(),
            name: node.title.clone(),
            subtopic_id: subtopic_id.to_string(),
            index_label: node.index_label.clone(),
            ordinal: roman_to_int(&node.index_label),
            placeholder: false,
        })
        .collect();

    if chapters.is_empty() {
        chapters.push(Chapter {
            code: placeholder_code(subtopic_id),
            name: String::new(),
            subtopic_id: subtopic_id.to_string(),
            index_label: "0".to_string(),
            ordinal: 0,
            placeholder: true,
        });
    }

    let article_nodes = other_nodes
        .into_iter()
        .filter(|node| !node.code.is_empty())
        .collect();

    ChapterLayout {
        chapters,
        article_nodes,
    }
}

/// Code of the stand-in chapter for a subtopic without chapter headings. Derived from the
/// subtopic id so a re-run lands on the same row.
pub fn placeholder_code(subtopic_id: &str) -> String {
    Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("placeholder-chapter:{subtopic_id}").as_bytes(),
    )
    .to_string()
}

/// Value of a roman numeral label such as `XIV`; anything that is not one yields 0.
pub fn roman_to_int(label: &str) -> i64 {
    let label = label.trim();
    if label.is_empty() {
        return 0;
    }

    let mut values = Vec::with_capacity(label.len());
    for ch in label.chars() {
        let value = match ch.to_ascii_uppercase() {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return 0,
        };
        values.push(value);
    }

    let mut total = 0;
    for (idx, value) in values.iter().enumerate() {
        match values.get(idx + 1) {
            Some(next) if next > value => total -= value,
            _ => total += value,
        }
    }
    total
}
