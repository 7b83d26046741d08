use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "phapdien",
    version,
    about = "Rebuild the legal code hierarchy from reference listings and subtopic documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Ingest(IngestArgs),
    Status(StatusArgs),
    Validate(ValidateArgs),
}

/// Where the reference listings and subtopic documents live.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    #[arg(long, default_value = "phap-dien")]
    pub source_root: PathBuf,

    #[arg(long)]
    pub topics_path: Option<PathBuf>,

    #[arg(long)]
    pub subtopics_path: Option<PathBuf>,

    #[arg(long)]
    pub tree_nodes_path: Option<PathBuf>,

    #[arg(long)]
    pub documents_dir: Option<PathBuf>,

    #[arg(long, default_value = "html")]
    pub document_extension: String,
}

impl SourceArgs {
    pub fn topics_path(&self) -> PathBuf {
        self.topics_path
            .clone()
            .unwrap_or_else(|| self.source_root.join("chude.json"))
    }

    pub fn subtopics_path(&self) -> PathBuf {
        self.subtopics_path
            .clone()
            .unwrap_or_else(|| self.source_root.join("demuc.json"))
    }

    pub fn tree_nodes_path(&self) -> PathBuf {
        self.tree_nodes_path
            .clone()
            .unwrap_or_else(|| self.source_root.join("treeNode.json"))
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| self.source_root.join("demuc"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value = ".cache/phapdien")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// First document to process; earlier documents are reported as already done.
    #[arg(long)]
    pub checkpoint: Option<String>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[arg(long, default_value = ".cache/phapdien")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub ingest_manifest_path: Option<PathBuf>,

    /// Document filename to resume from (inclusive). Unset processes every document.
    #[arg(long)]
    pub checkpoint: Option<String>,

    /// Drop and recreate every table before loading.
    #[arg(long, default_value_t = false)]
    pub reset: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/phapdien")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long, default_value = ".cache/phapdien")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}

pub fn default_db_path(cache_root: &std::path::Path) -> PathBuf {
    cache_root.join("phapdien.sqlite")
}
