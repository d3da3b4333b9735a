pub mod config;
pub mod metadata;
pub mod metadata_csv;
pub mod orchestrator;
