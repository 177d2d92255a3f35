//! Ingestion orchestration for athenai.
//!
//! This crate ties the keyword file, GitHub search, README fetching and the
//! output writers into one run (`run_ingest`).

pub mod ingest;

pub use ingest::{
    IngestConfig, IngestReport, ProgressReporter, SilentProgress, load_keywords, run_ingest,
    write_output, write_records,
};
