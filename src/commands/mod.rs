pub mod ingest;
pub mod inventory;
pub mod status;
pub mod validate;
