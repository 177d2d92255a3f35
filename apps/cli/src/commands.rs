//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use athenai_core::{IngestConfig, IngestReport, ProgressReporter};
use athenai_github::GithubClient;
use athenai_shared::{
    AppConfig, GithubConfig, RepoRef, SearchMode, init_config, load_config, load_config_from,
    resolve_token,
};
use athenai_storage::Storage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// athenai: GitHub README ingestion and the skills/project matching schema.
#[derive(Parser)]
#[command(
    name = "athenai",
    version,
    about = "Collect GitHub READMEs by keyword and manage the skills/project database.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.athenai/athenai.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Repository field matched by search terms.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum ModeArg {
    Topic,
    Description,
}

impl From<ModeArg> for SearchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Topic => SearchMode::Topic,
            ModeArg::Description => SearchMode::Description,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Search every keyword in a file and write the READMEs of all hits.
    Ingest {
        /// Newline-delimited keyword file.
        #[arg(short, long)]
        keywords: Option<PathBuf>,

        /// Output text file (overwritten).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also write the decoded records as JSON.
        #[arg(long)]
        records: Option<PathBuf>,

        /// Search by topic or by description.
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Search repositories and print `owner/name` for each hit.
    Search {
        /// Terms to search for.
        #[arg(required = true)]
        terms: Vec<String>,

        /// Search by topic or by description.
        #[arg(short, long)]
        mode: Option<ModeArg>,
    },

    /// Fetch one repository's README and print it.
    Readme {
        /// Repository as OWNER/NAME.
        repo: RepoRef,
    },

    /// Domain model database management.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Database subcommands.
#[derive(Subcommand)]
pub(crate) enum DbAction {
    /// Create the database (or migrate an existing one).
    Init {
        /// Database file (defaults to `database.path` from config).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print row counts per table.
    Stats {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "athenai=info",
        1 => "athenai=debug",
        _ => "athenai=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Ingest {
            keywords,
            out,
            records,
            mode,
        } => cmd_ingest(&config, keywords, out, records, mode).await,
        Command::Search { terms, mode } => cmd_search(&config, &terms, mode).await,
        Command::Readme { repo } => cmd_readme(&config, &repo).await,
        Command::Db { action } => match action {
            DbAction::Init { path } => cmd_db_init(&db_path(&config, path)).await,
            DbAction::Stats { path } => cmd_db_stats(&db_path(&config, path)).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Build the one GitHub client shared by every request of this process.
fn github_client(config: &AppConfig) -> Result<GithubClient> {
    let token = resolve_token(config)?;
    let client = GithubClient::new(GithubConfig::from_section(&config.github, token))?;
    Ok(client)
}

fn db_path(config: &AppConfig, flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(&config.database.path))
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    config: &AppConfig,
    keywords: Option<PathBuf>,
    out: Option<PathBuf>,
    records: Option<PathBuf>,
    mode: Option<ModeArg>,
) -> Result<()> {
    let client = github_client(config)?;

    let ingest = IngestConfig {
        keywords_path: keywords.unwrap_or_else(|| PathBuf::from(&config.ingest.keywords_path)),
        output_path: out.unwrap_or_else(|| PathBuf::from(&config.ingest.output_path)),
        records_path: records,
        mode: mode.map(SearchMode::from).unwrap_or(config.ingest.mode),
    };

    info!(
        keywords = %ingest.keywords_path.display(),
        output = %ingest.output_path.display(),
        mode = %ingest.mode,
        "ingesting repositories"
    );

    let reporter = CliProgress::new();
    let report = ingest_with_progress(&ingest, &client, &reporter).await?;

    println!();
    println!("  Ingestion complete");
    println!("  Run:      {}", report.run_id);
    println!("  Terms:    {}", report.terms);
    println!("  Repos:    {}", report.repos_found);
    println!("  READMEs:  {}", report.readmes_written);
    println!("  Output:   {} ({} bytes)", report.output_path.display(), report.bytes_written);
    println!("  Time:     {:.1}s", report.elapsed.as_secs_f64());
    if !report.failures.is_empty() {
        println!("  Failures: {}", report.failures.len());
        for failure in &report.failures {
            println!("    - {failure}");
        }
    }
    println!();

    Ok(())
}

/// Run the ingestion, clearing the spinner whether or not it succeeds.
async fn ingest_with_progress(
    ingest: &IngestConfig,
    client: &GithubClient,
    reporter: &CliProgress,
) -> Result<IngestReport> {
    match athenai_core::run_ingest(ingest, client, reporter).await {
        Ok(report) => Ok(report),
        Err(e) => {
            reporter.spinner.finish_and_clear();
            Err(e.into())
        }
    }
}

async fn cmd_search(config: &AppConfig, terms: &[String], mode: Option<ModeArg>) -> Result<()> {
    let client = github_client(config)?;
    let mode = mode.map(SearchMode::from).unwrap_or(config.ingest.mode);

    let outcome = client.search(terms, mode).await;
    for repo in &outcome.repos {
        println!("{repo}");
    }
    for failure in &outcome.failures {
        eprintln!("warning: {failure}");
    }

    if outcome.repos.is_empty() && !outcome.failures.is_empty() {
        return Err(eyre!("every search term failed"));
    }
    Ok(())
}

async fn cmd_readme(config: &AppConfig, repo: &RepoRef) -> Result<()> {
    let client = github_client(config)?;
    let readme = fetch_single_readme(&client, repo).await?;
    println!("{readme}");
    Ok(())
}

async fn fetch_single_readme(client: &GithubClient, repo: &RepoRef) -> Result<String> {
    match client.fetch_readme(repo).await {
        Ok(record) => Ok(record.readme),
        Err(failure) => {
            let status = failure
                .status()
                .map_or_else(|| "none".to_string(), |code| code.to_string());
            Err(Report::new(failure)
                .wrap_err(format!("Failed to retrieve README (HTTP Status Code: {status})")))
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn repos_found(&self, count: usize) {
        self.spinner.set_message(format!("Found {count} repositories"));
    }

    fn done(&self, _report: &IngestReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

async fn cmd_db_init(path: &Path) -> Result<()> {
    let storage = Storage::open(path).await?;
    println!(
        "Database ready at {} (schema v{})",
        path.display(),
        storage.schema_version().await?
    );
    Ok(())
}

async fn cmd_db_stats(path: &Path) -> Result<()> {
    let storage = Storage::open_readonly(path).await?;
    println!("{} (schema v{})", path.display(), storage.schema_version().await?);
    for (table, count) in storage.table_counts().await? {
        println!("  {table:<28} {count}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
