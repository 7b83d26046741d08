use anyhow::{Context, Result};
use regex::Regex;

use crate::model::TreeNode;

use super::document::{AnchorIndex, DocNode, Kind, Sibling};

const PARAGRAPH: Kind = Kind::tag("p");
const ANCHOR_BLOCK: Kind = PARAGRAPH;
const NOTE_BLOCK: Kind = Kind::class("pGhiChu");
const BODY_BLOCK: Kind = Kind::class("pNoiDung");
const GUIDANCE_BLOCK: Kind = Kind::class("pChiDan");
const LINK: Kind = Kind::tag("a");
const TABLE: Kind = Kind::tag("table");

/// What the document holds for one article node.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub content: String,
    pub external_reference_text: String,
    pub external_reference_link: Option<String>,
    pub tables: Vec<String>,
    pub attachments: Vec<String>,
    /// Codes named by the related-articles block, unvalidated.
    pub related_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(ExtractedArticle),
    MissingAnchor,
    MissingContent,
}

pub struct ArticleExtractor {
    quoted_argument: Regex,
}

impl ArticleExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            quoted_argument: Regex::new(r"'([^']*)'")
                .context("failed to compile quoted argument regex")?,
        })
    }

    pub fn extract(&self, anchors: &AnchorIndex<'_>, node: &TreeNode) -> Extraction {
        let Some(anchor) = anchors.get(&node.code) else {
            return Extraction::MissingAnchor;
        };

        let mut title = anchor
            .next_sibling()
            .map(|sibling| sibling.text())
            .unwrap_or_default();
        if title.is_empty() {
            title = node.title.clone();
        }

        let anchor_block = anchor.find_ancestor(ANCHOR_BLOCK);

        let note = anchor_block.and_then(|block| block.find_next_sibling(NOTE_BLOCK));
        let external_reference_text = note.map(|block| block.text()).unwrap_or_default();
        let external_reference_link = note.and_then(|block| {
            block
                .select(LINK)
                .into_iter()
                .find_map(|link| link.attr("href"))
                .map(ToOwned::to_owned)
        });

        let body = anchor_block
            .and_then(|block| block.find_next_sibling(BODY_BLOCK))
            .or_else(|| anchor.parent().and_then(|parent| parent.find_next(BODY_BLOCK)));
        let Some(body) = body else {
            return Extraction::MissingContent;
        };

        let (content, tables, tail) = split_body(body);
        let (attachments, related_codes) = self.trailing_links(tail);

        Extraction::Found(ExtractedArticle {
            title,
            content,
            external_reference_text,
            external_reference_link,
            tables,
            attachments,
            related_codes,
        })
    }

    /// Attachment links directly after `tail`, the last node of the body, then the optional
    /// related-articles block.
    fn trailing_links(&self, tail: DocNode<'_>) -> (Vec<String>, Vec<String>) {
        let mut attachments = Vec::new();
        let mut cursor = tail.next_element_sibling();

        while let Some(element) = cursor {
            if !element.is(LINK) {
                break;
            }
            if let Some(href) = element.attr("href").filter(|href| !href.is_empty()) {
                attachments.push(href.to_string());
            }
            cursor = element.next_element_sibling();
        }

        let related_codes: Vec<String> = cursor
            .filter(|element| element.is(GUIDANCE_BLOCK))
            .map(|block| {
                block
                    .select(LINK)
                    .into_iter()
                    .filter_map(|link| link.attr("onclick"))
                    .filter(|onclick| !onclick.is_empty())
                    .map(|onclick| self.related_code(onclick))
                    .collect()
            })
            .unwrap_or_default();

        (attachments, related_codes)
    }

    /// Code passed to an inline click handler such as `ViewNoiDung('12.3.LQ.4')`. Input
    /// without a quoted argument comes back with its quotes stripped, which never names a
    /// real article and is discarded when relations are resolved.
    pub fn related_code(&self, onclick: &str) -> String {
        if let Some(captures) = self.quoted_argument.captures(onclick) {
            if let Some(argument) = captures.get(1) {
                return argument.as_str().trim().to_string();
            }
        }

        let inner = match (onclick.find('('), onclick.rfind(')')) {
            (Some(open), Some(close)) if open < close => &onclick[open + 1..close],
            _ => onclick,
        };
        inner.replace('\'', "").trim().to_string()
    }
}

/// Body text line by line, with `table` children kept aside as raw markup. Also returns the
/// last node belonging to the body, where the attachment scan starts.
fn split_body<'a>(body: DocNode<'a>) -> (String, Vec<String>, DocNode<'a>) {
    let mut content = String::new();
    let mut tables = Vec::new();

    for child in body.children() {
        match child {
            Sibling::Element(element) if element.is(TABLE) => tables.push(element.markup()),
            other => {
                content.push_str(&other.text());
                content.push('\n');
            }
        }
    }

    let mut tail = body;
    for sibling in split_continuation(body) {
        if let Sibling::Element(element) = sibling {
            tail = element;
            if element.is(TABLE) {
                tables.push(element.markup());
                continue;
            }
        }
        let text = sibling.text();
        if !text.is_empty() {
            content.push_str(&text);
            content.push('\n');
        }
    }

    (content.trim().to_string(), tables, tail)
}

/// Rest of a `p` body that the parser moved out of it. In a standards-mode document a `table`
/// cannot sit inside a `p`, so the paragraph is closed right before the table and everything
/// up to the original `</p>` follows as siblings, ending in the empty `p` that the stray
/// closing tag produces. Without that empty `p` nothing is taken.
fn split_continuation(body: DocNode<'_>) -> Vec<Sibling<'_>> {
    if !body.is(PARAGRAPH) {
        return Vec::new();
    }

    let following = body.following_siblings();
    let split = matches!(following.first(), Some(Sibling::Element(element)) if element.is(TABLE));
    if !split {
        return Vec::new();
    }

    let mut taken = Vec::new();
    for sibling in following {
        if let Sibling::Element(element) = sibling {
            if element.is(PARAGRAPH) {
                if element.attr("class").is_none() && element.text().is_empty() {
                    taken.push(sibling);
                    return taken;
                }
                break;
            }
            if !element.is(TABLE) && (element.is(LINK) || element.attr("class").is_some()) {
                break;
            }
        }
        taken.push(sibling);
    }

    // No closing marker: the table was written outside the paragraph.
    Vec::new()
}
