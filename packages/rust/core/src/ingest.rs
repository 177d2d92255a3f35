//! End-to-end ingestion: keyword file → search → README fetch → text file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use athenai_github::{FetchFailure, GithubClient};
use athenai_shared::{AthenaiError, ReadmeRecord, Result, RunId, SearchMode};

/// Configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Newline-delimited keyword file.
    pub keywords_path: PathBuf,
    /// Concatenated README output, overwritten on each run.
    pub output_path: PathBuf,
    /// Optional JSON dump of every [`ReadmeRecord`].
    pub records_path: Option<PathBuf>,
    /// Search by topic or by description.
    pub mode: SearchMode,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct IngestReport {
    pub run_id: RunId,
    /// Keywords read from the input file.
    pub terms: usize,
    /// Repositories returned by search, across all terms.
    pub repos_found: usize,
    /// READMEs decoded and written.
    pub readmes_written: usize,
    /// Bytes written to the output file.
    pub bytes_written: usize,
    /// Terms and repositories that produced nothing.
    pub failures: Vec<FetchFailure>,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once search has finished.
    fn repos_found(&self, count: usize);
    /// Called when the run completes.
    fn done(&self, report: &IngestReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn repos_found(&self, _count: usize) {}
    fn done(&self, _report: &IngestReport) {}
}

/// Run the full ingestion.
///
/// 1. Load keywords
/// 2. Search every keyword
/// 3. Fetch and decode READMEs
/// 4. Write the concatenated bodies (and optionally the records)
///
/// Only an unreadable keyword file or an unwritable output is fatal; failed
/// terms and repositories are collected in the report.
#[instrument(skip_all, fields(mode = %config.mode, keywords = %config.keywords_path.display()))]
pub async fn run_ingest(
    config: &IngestConfig,
    client: &GithubClient,
    progress: &dyn ProgressReporter,
) -> Result<IngestReport> {
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, "starting ingestion run");

    // --- Phase 1: Keywords ---
    progress.phase("Reading keywords");
    let terms = load_keywords(&config.keywords_path)?;
    if terms.is_empty() {
        warn!(path = %config.keywords_path.display(), "keyword file has no terms");
    }

    // --- Phase 2: Search ---
    progress.phase(&format!("Searching {} term(s) by {}", terms.len(), config.mode));
    let search = client.search(&terms, config.mode).await;
    progress.repos_found(search.repos.len());

    // --- Phase 3: READMEs ---
    progress.phase(&format!("Fetching {} README(s)", search.repos.len()));
    let fetched = client.fetch_readmes(&search.repos).await;

    // --- Phase 4: Output ---
    progress.phase("Writing output");
    let mut failures = search.failures;
    failures.extend(fetched.failures);

    let bytes_written = write_output(&config.output_path, &fetched.records)?;
    if let Some(records_path) = &config.records_path {
        write_records(records_path, &run_id, &fetched.records, &failures)?;
    }

    let report = IngestReport {
        run_id,
        terms: terms.len(),
        repos_found: search.repos.len(),
        readmes_written: fetched.records.len(),
        bytes_written,
        failures,
        output_path: config.output_path.clone(),
        elapsed: start.elapsed(),
    };

    progress.done(&report);

    info!(
        run_id = %report.run_id,
        terms = report.terms,
        repos = report.repos_found,
        readmes = report.readmes_written,
        failures = report.failures.len(),
        elapsed_ms = report.elapsed.as_millis(),
        "ingestion run complete"
    );

    Ok(report)
}

/// Read a newline-delimited keyword file.
///
/// Line terminators (`\n` or `\r\n`) and surrounding whitespace are stripped;
/// blank lines are skipped.
pub fn load_keywords(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| AthenaiError::io(path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Write every README body back to back, replacing any existing file.
/// Returns the number of bytes written.
pub fn write_output(path: &Path, records: &[ReadmeRecord]) -> Result<usize> {
    ensure_parent(path)?;
    let body: String = records.iter().map(|r| r.readme.as_str()).collect();
    std::fs::write(path, &body).map_err(|e| AthenaiError::io(path, e))?;
    Ok(body.len())
}

/// Write the run as pretty JSON: `{ "run_id", "records", "failures" }`.
pub fn write_records(
    path: &Path,
    run_id: &RunId,
    records: &[ReadmeRecord],
    failures: &[FetchFailure],
) -> Result<()> {
    ensure_parent(path)?;
    let document = serde_json::json!({
        "run_id": run_id,
        "records": records,
        "failures": failures,
    });
    let json = serde_json::to_string_pretty(&document)
        .map_err(|e| AthenaiError::parse(format!("failed to serialize records: {e}")))?;
    std::fs::write(path, json).map_err(|e| AthenaiError::io(path, e))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|e| AthenaiError::io(parent, e))
        }
        _ => Ok(()),
    }
}
