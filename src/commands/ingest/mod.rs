mod anchors;
mod batch;
mod chapters;
mod cross_refs;
mod db_setup;
mod document;
mod pipeline;
mod reference;
mod report;
mod run;
mod store;
#[cfg(test)]
mod tests;

pub use batch::{ResumableBatch, list_documents, subtopic_id_for};
#[cfg(test)]
pub use db_setup::ensure_schema;
pub use run::run;
