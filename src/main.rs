//! Sitelex: site-scoped web crawler with a lemma frequency search index

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sitelex::config::{Config, LogFormat};
use sitelex::http::HttpServer;
use sitelex::indexing::IndexingService;
use sitelex::storage::{SearchStore, SledStore};
use sitelex::types::SiteStatus;

#[derive(Parser)]
#[command(name = "sitelex")]
#[command(about = "Site-scoped web crawler with a lemma frequency search index")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve,

    /// Crawl all configured sites once and exit
    Crawl,

    /// Fetch and index a single page
    IndexPage {
        /// Absolute URL of the page
        url: String,
    },

    /// Show index statistics
    Stats,

    /// Write a starter configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { path } = &cli.command {
        return init_config(path.clone());
    }

    let config = Config::load(&cli.config)?;
    setup_logging(&config, cli.verbose)?;

    std::fs::create_dir_all(&config.storage.data_dir)
        .context("Failed to create data directory")?;
    let store: Arc<dyn SearchStore> = Arc::new(SledStore::open(&config.storage.data_dir)?);
    let service = Arc::new(IndexingService::new(&config, Arc::clone(&store))?);

    match cli.command {
        Commands::Serve => serve(config, service, store).await,
        Commands::Crawl => crawl(service, store).await,
        Commands::IndexPage { url } => {
            service.index_single_page(&url).await?;
            println!("indexed {url}");
            Ok(())
        }
        Commands::Stats => {
            let report = service.statistics()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Init { .. } => unreachable!("handled above"),
    }
}

fn setup_logging(config: &Config, verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sitelex={default_level}")));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

async fn serve(
    config: Config,
    service: Arc<IndexingService>,
    store: Arc<dyn SearchStore>,
) -> Result<()> {
    if !config.http.enabled {
        bail!("HTTP server is disabled in the configuration");
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    let server = HttpServer::new(config.http.clone(), Arc::clone(&service));
    server.run(shutdown_rx).await?;

    // Let an in-flight campaign wind down before the store closes.
    if service.is_running() {
        service.stop()?;
        service.wait_idle().await;
    }
    store.flush()?;
    Ok(())
}

async fn crawl(service: Arc<IndexingService>, store: Arc<dyn SearchStore>) -> Result<()> {
    service.start()?;
    service.wait_idle().await;
    store.flush()?;

    let report = service.statistics()?;
    let mut failed = Vec::new();
    for site in &report.detailed {
        info!(
            site = %site.url,
            status = %site.status,
            pages = site.pages,
            lemmas = site.lemmas,
            "site finished"
        );
        if site.status == SiteStatus::Failed {
            failed.push(site.url.clone());
        }
    }
    println!(
        "crawled {} sites: {} pages, {} lemmas",
        report.total.sites, report.total.pages, report.total.lemmas
    );
    if !failed.is_empty() {
        bail!("crawl failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn init_config(path: PathBuf) -> Result<()> {
    let config_path = path.join("config.toml");
    if config_path.exists() {
        bail!("config file already exists: {}", config_path.display());
    }

    let toml_content = r#"# Sitelex configuration

[[sites]]
url = "http://example.com"
name = "Example"

[crawl]
max_depth = 10
fetch_delay_ms = 500
request_timeout_secs = 10
max_concurrent_fetches = 8
index_pages = true

[storage]
data_dir = ".sitelex"

[http]
enabled = true
listen_addr = "127.0.0.1:8080"

[logging]
format = "text"
level = "info"
"#;

    std::fs::write(&config_path, toml_content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(())
}
