use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Document filenames in `dir` carrying `extension`, in lexical order.
pub fn list_documents(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let mut documents = Vec::new();

    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches_extension {
            continue;
        }

        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            documents.push(name.to_string());
        }
    }

    documents.sort();
    Ok(documents)
}

/// `<subtopic-id>.<extension>` → `<subtopic-id>`.
pub fn subtopic_id_for(filename: &str) -> &str {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(filename)
}

/// Yields nothing until `start` accepts an item, then everything from that item on.
pub struct ResumableBatch<I, P> {
    inner: I,
    start: P,
    started: bool,
    skipped: usize,
}

impl<I, P> ResumableBatch<I, P>
where
    I: Iterator<Item = String>,
    P: FnMut(&str) -> bool,
{
    pub fn new(inner: I, start: P) -> Self {
        Self {
            inner,
            start,
            started: false,
            skipped: 0,
        }
    }

    /// Number of items passed over before the start item.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn started(&self) -> bool {
        self.started
    }
}

impl ResumableBatch<std::vec::IntoIter<String>, Box<dyn FnMut(&str) -> bool>> {
    /// Resumes at `checkpoint` (inclusive); without one every document is yielded.
    pub fn from_checkpoint(documents: Vec<String>, checkpoint: Option<String>) -> Self {
        let start: Box<dyn FnMut(&str) -> bool> = match checkpoint {
            Some(checkpoint) => Box::new(move |name: &str| name == checkpoint),
            None => Box::new(|_: &str| true),
        };
        Self::new(documents.into_iter(), start)
    }
}

impl<I, P> Iterator for ResumableBatch<I, P>
where
    I: Iterator<Item = String>,
    P: FnMut(&str) -> bool,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for item in self.inner.by_ref() {
            if !self.started {
                if !(self.start)(&item) {
                    self.skipped += 1;
                    continue;
                }
                self.started = true;
            }
            return Some(item);
        }
        None
    }
}
