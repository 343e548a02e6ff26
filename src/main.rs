//! Command-line entry point: scrape one job board into a CSV file.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rolecrawl::enrich::DEFAULT_ENRICHMENT_MODEL;
use rolecrawl::{pipeline, CsvSink, PlatformRegistry, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "rolecrawl", about = "Scrape a career site into normalized job records")]
struct Cli {
    /// Company whose board is being scraped; attached to every record.
    company_name: String,

    /// Absolute URL of the job board listing page.
    target_url: String,

    /// Platform the board runs on.
    #[arg(long, default_value = "workday")]
    platform: String,

    /// Maximum listing pages to crawl. Unset crawls all pages.
    #[arg(long)]
    max_pages: Option<usize>,

    /// In-flight detail fetch limit. Defaults to the platform's setting.
    #[arg(long)]
    concurrency: Option<usize>,

    /// CSV file to append records to.
    #[arg(long, default_value = "jobs.csv")]
    out: String,

    /// Run the browser with a visible window.
    #[arg(long)]
    headful: bool,

    /// Enable remote-LLM location enrichment.
    #[arg(long)]
    enrich: bool,

    /// Credential for the enrichment service.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    enrich_api_key: Option<String>,

    /// Model identifier for the enrichment service.
    #[arg(long, env = "INTELLIGENT_PARSER_LLM", default_value = DEFAULT_ENRICHMENT_MODEL)]
    enrich_model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = RunConfig::new(&cli.company_name, &cli.target_url, &cli.platform);
    config.max_pages = cli.max_pages;
    config.job_detail_concurrency = cli.concurrency;
    config.headless = !cli.headful;
    config.enrichment.enabled = cli.enrich;
    config.enrichment.api_key = cli.enrich_api_key;
    config.enrichment.model = cli.enrich_model;

    let registry = PlatformRegistry::with_builtin();
    let mut sink = CsvSink::new(&cli.out);

    let report = pipeline::run(&config, &registry, &mut sink).await?;

    println!(
        "{}: {} records written to {} ({} summaries, {} detail failures, {} duplicates, {} stale)",
        report.company_name,
        report.records_emitted,
        cli.out,
        report.summaries,
        report.detail_failures,
        report.duplicates_dropped,
        report.stale_dropped,
    );
    Ok(())
}
