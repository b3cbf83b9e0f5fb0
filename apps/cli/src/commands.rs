//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docweaver_core::completion::HttpCompletionClient;
use docweaver_core::pipeline::{ProgressReporter, WriteConfig, WriteResult, write_document};
use docweaver_media::MediaFetcher;
use docweaver_retrieval::{ChunkStore, KnowledgeStore};
use docweaver_search::DuckDuckGo;
use docweaver_shared::{init_config, load_config, validate_api_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Docweaver — turn a topic into a grounded, illustrated document.
#[derive(Parser)]
#[command(
    name = "docweaver",
    version,
    about = "Write grounded, illustrated long-form documents from a topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate a document for a topic.
    Run {
        /// Topic of the document.
        #[arg(short, long)]
        topic: String,

        /// Directory of reference files to ingest before writing.
        #[arg(short, long)]
        files: Option<String>,

        /// Output directory for the run.
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docweaver=info",
        1 => "docweaver=debug",
        _ => "docweaver=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run { topic, files, out } => {
            cmd_run(&topic, files.as_deref(), out.as_deref()).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn cmd_run(topic: &str, files: Option<&str>, out: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let api_key = validate_api_key(&config)?;

    let output_root = PathBuf::from(out.unwrap_or(&config.defaults.output_dir));
    let files_dir = PathBuf::from(files.unwrap_or(&config.defaults.files_dir));

    // Collaborators.
    let completion = HttpCompletionClient::new(config.llm.base_url.as_str(), api_key)?;
    let web = DuckDuckGo::new()?;
    let media = MediaFetcher::with_options(
        config.media.download_timeout_secs,
        config.media.min_asset_kb * 1024,
    )?;

    // Ingest reference files when the directory has any; ingestion is a
    // run prerequisite, not part of the per-section pipeline.
    let mut store = ChunkStore::new(config.store.chunk_chars);
    if files_dir.is_dir() && files_dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        println!("  Ingesting reference files from {}", files_dir.display());
        store.ingest_dir(&files_dir).await?;
        println!("  Ingested {} chunks", store.len());
    }

    let write_config = WriteConfig {
        topic: topic.to_string(),
        output_root,
        planner_model: config.llm.planner_model.clone(),
        writer_model: config.llm.writer_model.clone(),
        visualizer_model: config.llm.visualizer_model.clone(),
    };

    info!(topic, "starting document run");

    let reporter = CliProgress::new();
    let result = write_document(
        &write_config,
        &completion,
        &store,
        &web,
        &web,
        &media,
        &reporter,
    )
    .await?;

    // Print summary
    println!();
    println!("  Document generated successfully!");
    println!("  Topic:    {topic}");
    println!("  Sections: {}", result.section_count);
    println!("  Images:   {}", result.assets_acquired);
    println!("  Path:     {}", result.document_path.display());
    println!(
        "  Time:     {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn section_started(&self, title: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Writing [{current}/{total}] {title}"
        ));
    }

    fn section_completed(&self, title: &str, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Finished [{current}/{total}] {title}"
        ));
    }

    fn done(&self, _result: &WriteResult) {
        self.spinner.finish_and_clear();
    }
}
