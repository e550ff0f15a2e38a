use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use browserless_client::BrowserlessClient;
use imenik_common::Config;
use imenik_scraper::browser::{Browser, FetchingBrowser};
use imenik_scraper::cache::ResultCache;
use imenik_scraper::display::spawn_progress_reporter;
use imenik_scraper::orchestrator::Orchestrator;
use imenik_scraper::progress::ProgressTracker;
use imenik_scraper::session::NameScraper;
use imenik_scraper::sink::export_entries;
use imenik_scraper::store::{dedupe_terms, load_names, OutputWriter};

#[derive(Parser)]
#[command(name = "imenik", about = "Scrape the Imenik phone directory by name")]
struct Cli {
    /// JSON array of names to search for
    #[arg(default_value = "names.json")]
    input: PathBuf,

    /// Write compact JSON instead of two-space indented
    #[arg(long)]
    minify: bool,

    /// Ignore cache.json and do not update it
    #[arg(long)]
    no_cache: bool,

    /// Also insert the results into the document store (needs DATABASE_URL)
    #[arg(long)]
    sink: bool,

    /// Names scraped concurrently per batch [default: IMENIK_BATCH_SIZE or 10]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Output file [default: IMENIK_OUTPUT_PATH or imenik-results.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "Imenik run failed");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("imenik=info,imenik_scraper=info,imenik_common=info,browserless_client=info")
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Imenik scraper starting...");

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(batch_size) = cli.batch_size {
        anyhow::ensure!(batch_size > 0, "--batch-size must be at least 1");
        config.batch_size = batch_size;
    }
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    config.log_redacted();

    let names = load_names(&cli.input)
        .await
        .with_context(|| format!("Failed to load names from {}", cli.input.display()))?;
    let names = dedupe_terms(names);
    info!(unique = names.len(), "Names ready");

    let client = BrowserlessClient::new(
        &config.browserless_url,
        config.browserless_token.as_deref(),
        config.navigation_timeout,
        config.wait_timeout,
    )
    .context("Failed to build Browserless client")?;
    let browser: Arc<dyn Browser> = Arc::new(FetchingBrowser::new(Arc::new(client)));

    let scraper = NameScraper::new(browser.clone(), &config.base_url, &config.selectors)
        .context("Invalid directory selectors")?;
    let progress = Arc::new(ProgressTracker::new());
    let reporter = spawn_progress_reporter(progress.subscribe());

    let orchestrator = Orchestrator::builder()
        .scraper(Arc::new(scraper))
        .progress(progress)
        .output(OutputWriter::new(&config.output_path, cli.minify))
        .batch_size(config.batch_size)
        .build();

    let mut cache = if cli.no_cache {
        ResultCache::empty(&config.cache_path)
    } else {
        ResultCache::load(&config.cache_path).await
    };

    let outcome = tokio::select! {
        outcome = orchestrator.scrape_by_names(&names, &mut cache, cli.no_cache) => outcome,
        signal = shutdown_signal() => {
            warn!(signal, "Interrupted, tearing down browser");
            browser.shutdown().await;
            reporter.abort();
            std::process::exit(130);
        }
    };
    reporter.abort();

    if !cli.no_cache {
        if let Err(e) = cache.save().await {
            warn!(path = %cache.path().display(), error = %e, "Failed to save cache");
        }
    }

    if cli.sink {
        export_entries(&config, &outcome.entries).await;
    }

    browser.shutdown().await;
    info!(
        output = %config.output_path.display(),
        entries = outcome.entries.len(),
        "Saved entries"
    );
    info!("{}", outcome.stats);
    Ok(())
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}
