//! Navigation over a parsed subtopic document.
//!
//! Article recovery only ever moves through the tree in a handful of ways: sideways to the
//! next sibling, up to an enclosing block, or forward in document order. Those moves are the
//! whole surface of [`DocNode`], so the extraction code never touches the parser directly.

use std::collections::HashMap;

use scraper::node::Element;
use scraper::{CaseSensitivity, ElementRef, Html, Node};

/// Tag and/or class an element must carry to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kind {
    tag: Option<&'static str>,
    class: Option<&'static str>,
}

impl Kind {
    pub const fn tag(tag: &'static str) -> Self {
        Self {
            tag: Some(tag),
            class: None,
        }
    }

    pub const fn class(class: &'static str) -> Self {
        Self {
            tag: None,
            class: Some(class),
        }
    }

    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = self.tag {
            if !element.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(class) = self.class {
            if !element.has_class(class, CaseSensitivity::CaseSensitive) {
                return false;
            }
        }
        true
    }
}

pub struct SourceDocument {
    html: Html,
}

impl SourceDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// Named anchors (`<a name="...">`) keyed by name; the first occurrence of a name wins.
    pub fn anchors(&self) -> AnchorIndex<'_> {
        let mut anchors = HashMap::new();
        for element in self
            .html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
        {
            if !element.value().name().eq_ignore_ascii_case("a") {
                continue;
            }
            if let Some(name) = element.value().attr("name") {
                anchors.entry(name).or_insert(DocNode::new(element));
            }
        }
        AnchorIndex { anchors }
    }
}

pub struct AnchorIndex<'a> {
    anchors: HashMap<&'a str, DocNode<'a>>,
}

impl<'a> AnchorIndex<'a> {
    pub fn get(&self, code: &str) -> Option<DocNode<'a>> {
        self.anchors.get(code).copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }
}

/// A child or sibling position in the document: an element or a run of text.
#[derive(Debug, Clone, Copy)]
pub enum Sibling<'a> {
    Element(DocNode<'a>),
    Text(&'a str),
}

impl Sibling<'_> {
    /// Text as the title and content extraction see it: collapsed for elements, trimmed for text.
    pub fn text(&self) -> String {
        match self {
            Sibling::Element(node) => node.text(),
            Sibling::Text(text) => text.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocNode<'a> {
    element: ElementRef<'a>,
}

impl<'a> DocNode<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    pub fn is(&self, kind: Kind) -> bool {
        kind.matches(self.element.value())
    }

    /// Descendant text runs, each trimmed, empty runs dropped, joined by single spaces.
    pub fn text(&self) -> String {
        self.element
            .text()
            .map(str::trim)
            .filter(|run| !run.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialized markup of the element itself, tags included.
    pub fn markup(&self) -> String {
        self.element.html()
    }

    pub fn parent(&self) -> Option<DocNode<'a>> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(DocNode::new)
    }

    /// Nearest enclosing element matching `kind`, not counting the node itself.
    pub fn find_ancestor(&self, kind: Kind) -> Option<DocNode<'a>> {
        self.element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| kind.matches(element.value()))
            .map(DocNode::new)
    }

    /// Following sibling, skipping comments and whitespace-only text.
    pub fn next_sibling(&self) -> Option<Sibling<'a>> {
        self.following_siblings()
            .into_iter()
            .find(|sibling| !matches!(sibling, Sibling::Text(text) if text.trim().is_empty()))
    }

    /// Every following sibling in order, whitespace text included; comments are left out.
    pub fn following_siblings(&self) -> Vec<Sibling<'a>> {
        self.element
            .next_siblings()
            .filter_map(|sibling| match sibling.value() {
                Node::Text(text) => {
                    let text: &'a str = text;
                    Some(Sibling::Text(text))
                }
                Node::Element(_) => {
                    ElementRef::wrap(sibling).map(|el| Sibling::Element(DocNode::new(el)))
                }
                _ => None,
            })
            .collect()
    }

    /// Following sibling element, whatever its kind.
    pub fn next_element_sibling(&self) -> Option<DocNode<'a>> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(DocNode::new)
    }

    /// First following sibling element matching `kind`.
    pub fn find_next_sibling(&self, kind: Kind) -> Option<DocNode<'a>> {
        self.element
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|element| kind.matches(element.value()))
            .map(DocNode::new)
    }

    /// First element after this node's start tag in document order matching `kind`; the
    /// node's own descendants come first, then whatever follows it.
    pub fn find_next(&self, kind: Kind) -> Option<DocNode<'a>> {
        let inside = self
            .element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|element| kind.matches(element.value()));
        if let Some(found) = inside {
            return Some(DocNode::new(found));
        }

        let mut current = Some(*self.element);
        while let Some(node) = current {
            for sibling in node.next_siblings() {
                let found = sibling
                    .descendants()
                    .filter_map(ElementRef::wrap)
                    .find(|element| kind.matches(element.value()));
                if let Some(found) = found {
                    return Some(DocNode::new(found));
                }
            }
            current = node.parent();
        }
        None
    }

    /// Immediate children in order; comments are left out.
    pub fn children(&self) -> Vec<Sibling<'a>> {
        self.element
            .children()
            .filter_map(|child| match child.value() {
                Node::Text(text) => {
                    let text: &'a str = text;
                    Some(Sibling::Text(text))
                }
                Node::Element(_) => {
                    ElementRef::wrap(child).map(|el| Sibling::Element(DocNode::new(el)))
                }
                _ => None,
            })
            .collect()
    }

    /// Descendant elements matching `kind`, in document order.
    pub fn select(&self, kind: Kind) -> Vec<DocNode<'a>> {
        self.element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|element| kind.matches(element.value()))
            .map(DocNode::new)
            .collect()
    }
}
